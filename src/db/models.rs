/// Row of a per-instrument tick table. Columns match `schema::ensure_table`.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct TickRow {
    pub scdatetime: i64,
    pub price: f64,
    pub quantity: i64,
    /// 1 = bid side, 0 = ask side.
    pub side: i64,
}
