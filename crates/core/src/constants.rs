use rust_decimal::Decimal;

/// Table holding the current balance of every account
pub const BALANCES_TABLE: &str = "account_balances";

/// Table holding account transactions
pub const TRANSACTIONS_TABLE: &str = "transactions";

/// Event name shared by the in-process bus and the platform emitter
pub const BALANCE_UPDATED_EVENT: &str = "balance-updated";

/// Number of monthly buckets in a default history series
pub const DEFAULT_HISTORY_MONTHS: u32 = 12;

/// Upper bound on monthly buckets in one history series (ten years)
pub const MAX_HISTORY_MONTHS: u32 = 120;

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Month-over-month percentages within +/- this band are reported as neutral
pub const TREND_DEAD_ZONE_PERCENT: Decimal = Decimal::from_parts(1, 0, 0, false, 1);
