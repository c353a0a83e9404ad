// src/db/snapshot_repo.rs

use std::sync::{Arc, RwLock};

use crate::models::snapshot::AnalysisSnapshot;

// Único ponto de estado mutável compartilhado: o snapshot da última análise.
// Leitores recebem um `Arc` e nunca seguram o lock enquanto renderizam.
pub trait SnapshotStore: Send + Sync {
    // Substitui o snapshot atual por inteiro
    fn replace(&self, snapshot: AnalysisSnapshot) -> Arc<AnalysisSnapshot>;

    fn get(&self) -> Option<Arc<AnalysisSnapshot>>;

    // Retorna true se havia um snapshot
    fn clear(&self) -> bool;
}

#[derive(Default)]
pub struct InMemorySnapshotStore {
    current: RwLock<Option<Arc<AnalysisSnapshot>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn replace(&self, snapshot: AnalysisSnapshot) -> Arc<AnalysisSnapshot> {
        let snapshot = Arc::new(snapshot);
        // Um lock envenenado ainda guarda um valor consistente: a troca é atômica
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(Arc::clone(&snapshot));
        snapshot
    }

    fn get(&self) -> Option<Arc<AnalysisSnapshot>> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn clear(&self) -> bool {
        self.current.write().unwrap_or_else(|e| e.into_inner()).take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis_service::tests::{as_of, sample_csv, service};

    fn snapshot(name: &str) -> AnalysisSnapshot {
        service().analyze_csv(sample_csv().as_bytes(), name, as_of()).unwrap()
    }

    #[test]
    fn replace_get_and_clear() {
        let store = InMemorySnapshotStore::new();
        assert!(store.get().is_none());
        assert!(!store.clear());

        store.replace(snapshot("first.csv"));
        assert_eq!(store.get().unwrap().source_name, "first.csv");

        store.replace(snapshot("second.csv"));
        assert_eq!(store.get().unwrap().source_name, "second.csv");

        assert!(store.clear());
        assert!(store.get().is_none());
    }

    #[tokio::test]
    async fn readers_keep_their_snapshot_after_replacement() {
        let store: Arc<dyn SnapshotStore> = Arc::new(InMemorySnapshotStore::new());
        store.replace(snapshot("old.csv"));

        let held = store.get().unwrap();

        let writer = Arc::clone(&store);
        tokio::task::spawn_blocking(move || writer.replace(snapshot("new.csv")))
            .await
            .unwrap();

        // O leitor antigo continua com uma visão completa do snapshot anterior
        assert_eq!(held.source_name, "old.csv");
        assert_eq!(held.plans.len(), 4);
        assert_eq!(store.get().unwrap().source_name, "new.csv");
    }
}
