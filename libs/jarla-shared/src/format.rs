//! Display helpers for projection numbers. The engine keeps full precision;
//! rounding happens only here.

pub fn format_views(views: f64) -> String {
    format!("{} views", compact(views))
}

pub fn format_money(amount: f64, currency: &str) -> String {
    format!("{} {}", amount.round() as i64, currency)
}

fn compact(value: f64) -> String {
    let abs = value.abs();
    // Values that round up to the next unit move to it: 999_950 is 1M, not 1000K.
    if abs >= 1_000_000.0 || round_tenth(abs / 1_000.0) >= 1_000.0 {
        trim(value / 1_000_000.0, "M")
    } else if abs >= 1_000.0 || abs.round() >= 1_000.0 {
        trim(value / 1_000.0, "K")
    } else {
        format!("{}", value.round() as i64)
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn trim(scaled: f64, suffix: &str) -> String {
    let text = format!("{:.1}", round_tenth(scaled));
    let text = text.strip_suffix(".0").unwrap_or(&text);
    format!("{}{}", text, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_are_compacted() {
        assert_eq!(format_views(950.0), "950 views");
        assert_eq!(format_views(12000.0), "12K views");
        assert_eq!(format_views(12500.0), "12.5K views");
        assert_eq!(format_views(1_500_000.0), "1.5M views");
    }

    #[test]
    fn rounding_rolls_over_into_the_next_unit() {
        assert_eq!(format_views(999_950.0), "1M views");
        assert_eq!(format_views(999_940.0), "999.9K views");
        assert_eq!(format_views(999.6), "1K views");
    }

    #[test]
    fn money_is_rounded_to_whole_units() {
        assert_eq!(format_money(420.0, "sek"), "420 sek");
        assert_eq!(format_money(99.6, "sek"), "100 sek");
    }
}
