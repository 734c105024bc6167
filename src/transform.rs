use crate::db::TickRow;
use crate::error::{AppError, Result};
use crate::types::RawRecord;

/// Map decoded records onto destination rows, one for one and in order.
pub fn to_rows(records: &[RawRecord]) -> Result<Vec<TickRow>> {
    records.iter().map(to_row).collect()
}

/// Bid side wins only on strictly greater volume; a tie (including 0/0)
/// is booked on the ask side.
///
/// Fails if the timestamp does not fit the signed BIGINT column.
pub fn to_row(r: &RawRecord) -> Result<TickRow> {
    let bid_side = r.bidvolume > r.askvolume;
    Ok(TickRow {
        scdatetime: i64::try_from(r.scdatetime)
            .map_err(|_| AppError::TimestampOutOfRange(r.scdatetime))?,
        price: f64::from(r.close),
        quantity: i64::from(if bid_side { r.bidvolume } else { r.askvolume }),
        side: i64::from(bid_side),
    })
}
