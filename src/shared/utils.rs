//! Utility functions and helpers

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

/// Render a fixed-point integer as a grouped decimal string, e.g.
/// `format_amount(&123456789000.into(), 8, 0)` -> `"1,235"`.
///
/// Rounds half away from zero at `precision` fractional digits.
pub fn format_amount(amount: &BigInt, decimals: u32, precision: u32) -> String {
    let precision = precision.min(decimals);
    let drop = BigInt::from(10u32).pow(decimals - precision);
    let magnitude = amount.abs();

    let mut scaled = &magnitude / &drop;
    if (&magnitude % &drop) * 2u32 >= drop && decimals > precision {
        scaled += 1u32;
    }

    let padded = format!("{:0>width$}", scaled.to_string(), width = precision as usize + 1);
    let split = padded.len() - precision as usize;
    let sign = if amount.is_negative() && !scaled.is_zero() { "-" } else { "" };
    let int_part = group_thousands(&padded[..split]);

    if precision == 0 {
        format!("{}{}", sign, int_part)
    } else {
        format!("{}{}.{}", sign, int_part, &padded[split..])
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Signed change with an explicit `+` for increases.
pub fn format_change(delta: &BigInt, decimals: u32, precision: u32) -> String {
    let body = format_amount(delta, decimals, precision);
    if delta.is_negative() {
        body
    } else {
        format!("+{}", body)
    }
}

/// "a minute" / "10 minutes"
pub fn describe_window(minutes: u64) -> String {
    if minutes == 1 {
        "a minute".to_string()
    } else {
        format!("{} minutes", minutes)
    }
}

/// Ticker part of a THORChain asset, `ETH.USDC-0xA0B8...` -> `ETH.USDC`.
pub fn asset_ticker(asset: &str) -> &str {
    asset.split('-').next().unwrap_or(asset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_whole_units() {
        assert_eq!(format_amount(&BigInt::from(123_456_789_000i64), 8, 0), "1,235");
        assert_eq!(format_amount(&BigInt::from(100_000_000i64), 8, 0), "1");
        assert_eq!(format_amount(&BigInt::from(0), 8, 0), "0");
    }

    #[test]
    fn test_format_amount_with_precision() {
        assert_eq!(format_amount(&BigInt::from(512_345_678i64), 8, 2), "5.12");
        assert_eq!(format_amount(&BigInt::from(1_000i64), 8, 4), "0.0000");
        assert_eq!(format_amount(&BigInt::from(-250_000_000i64), 8, 2), "-2.50");
        assert_eq!(
            format_amount(&BigInt::from(123_456_700_000_000i64), 8, 2),
            "1,234,567.00"
        );
    }

    #[test]
    fn test_format_change_sign() {
        assert_eq!(format_change(&BigInt::from(150_000_000i64), 8, 0), "+2");
        assert_eq!(format_change(&BigInt::from(-150_000_000i64), 8, 0), "-2");
    }

    #[test]
    fn test_describe_window() {
        assert_eq!(describe_window(1), "a minute");
        assert_eq!(describe_window(30), "30 minutes");
    }

    #[test]
    fn test_asset_ticker() {
        assert_eq!(asset_ticker("ETH.USDC-0XA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48"), "ETH.USDC");
        assert_eq!(asset_ticker("BTC.BTC"), "BTC.BTC");
    }
}
