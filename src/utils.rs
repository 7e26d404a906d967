use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use sqlx::SqlitePool;

pub(crate) async fn is_table_exists(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<bool, sqlx::Error> {
    Ok(
        sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?
            .is_some(),
    )
}

/// Current wall-clock time in `tz`, keeping the offset that was in force.
pub fn now_in(tz: Tz) -> DateTime<FixedOffset> {
    to_fixed(Utc::now(), tz)
}

pub(crate) fn to_fixed<T: TimeZone>(at: DateTime<T>, tz: Tz) -> DateTime<FixedOffset> {
    let local = at.with_timezone(&tz);
    local.with_timezone(&local.offset().fix())
}

pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use pretty_assertions::assert_eq;

    #[test]
    fn fixed_offset_follows_zone() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 5, 2, 30, 0).unwrap();
        let local = to_fixed(utc, chrono_tz::America::Argentina::Buenos_Aires);

        assert_eq!(local.offset().local_minus_utc(), -3 * 3600);
        assert_eq!(local.hour(), 23);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(local.timestamp(), utc.timestamp());
    }
}
