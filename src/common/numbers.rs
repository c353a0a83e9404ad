use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};

/// Maior valor aceito em qualquer coluna monetária (10^12). Acima disso a
/// célula é tratada como inválida.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

// Parcelas abaixo de um centavo não pagam nada
pub const MIN_PERIOD_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub fn is_plausible_amount(value: Decimal) -> bool {
    value.abs() <= MAX_AMOUNT
}

/// Soma que satura em vez de estourar.
pub fn saturating_sum<I: IntoIterator<Item = Decimal>>(values: I) -> Decimal {
    values.into_iter().fold(Decimal::ZERO, |acc, value| acc.saturating_add(value))
}

// Valores monetários: 2 casas
pub fn money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// Percentuais e pontuações: 1 casa
pub fn one_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole × 100` com uma casa; 0 quando `whole` é zero.
pub fn percentage(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    one_decimal(Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole))
}

/// Quantos períodos de `amount` cobrem `total`, arredondando para cima.
/// Zero quando `amount` não é positivo.
pub fn periods_to_cover(total: Decimal, amount: Decimal) -> u32 {
    if amount <= Decimal::ZERO || total <= Decimal::ZERO {
        return 0;
    }
    total
        .checked_div(amount)
        .and_then(|periods| periods.ceil().to_u32())
        .unwrap_or(u32::MAX)
}
