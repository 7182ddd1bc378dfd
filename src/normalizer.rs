// Price normalization: locale-formatted price text -> fixed-point amount
use crate::model::ExtractError;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

pub const CURRENCY_SYMBOL: &str = "€";

const CURRENCY_MARKERS: [&str; 5] = ["€", "$", "£", "¥", "EUR"];

/// Digit runs optionally joined by `.` or `,`, e.g. `1.234,56`.
static NUMERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("numeral regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPrice {
    pub amount: Decimal,
    pub display: String,
}

/// Turns raw price text into a two-decimal amount and its canonical display form.
///
/// The first numeral in the text is used. When the text carries a currency symbol and the
/// numeral is followed by a lone two-digit run (markup-split cents like `€123 45`), the two are
/// joined. Separators are disambiguated positionally: with both `.` and `,` present the last one
/// is decimal; a single separator followed by exactly three digits, or repeated, is grouping.
pub fn normalize(raw: &str) -> Result<NormalizedPrice, ExtractError> {
    let text = clean(raw);
    let mut numerals = NUMERAL.find_iter(&text);

    let first = numerals
        .next()
        .ok_or_else(|| ExtractError::UnparsablePrice(raw.to_string()))?;

    let (integer, fraction) = if has_currency(&text) && !first.as_str().contains(['.', ',']) {
        match numerals.next() {
            Some(next)
                if next.as_str().len() == 2
                    && next.as_str().bytes().all(|b| b.is_ascii_digit())
                    && text[first.end()..next.start()].trim().is_empty() =>
            {
                (first.as_str().to_string(), next.as_str().to_string())
            }
            _ => (first.as_str().to_string(), String::new()),
        }
    } else {
        split_numeral(first.as_str())
    };

    let fraction = if fraction.is_empty() { "0".to_string() } else { fraction };
    let amount = Decimal::from_str(&format!("{}.{}", integer, fraction))
        .map_err(|_| ExtractError::UnparsablePrice(raw.to_string()))?
        .round_dp(2);

    if amount.is_zero() {
        return Err(ExtractError::UnparsablePrice(raw.to_string()));
    }

    Ok(NormalizedPrice {
        amount,
        display: display(amount),
    })
}

/// Canonical display: currency symbol, integer part, comma, two fractional digits.
pub fn display(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2));
    format!("{}{}", CURRENCY_SYMBOL, fixed.replace('.', ","))
}

fn clean(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .replace(['\u{a0}', '\u{202f}'], " ")
        .trim()
        .to_string()
}

fn has_currency(text: &str) -> bool {
    CURRENCY_MARKERS.iter().any(|m| text.contains(m))
}

/// Splits a numeral into integer digits and fractional digits.
fn split_numeral(numeral: &str) -> (String, String) {
    let digits_only = |s: &str| s.chars().filter(|c| c.is_ascii_digit()).collect::<String>();

    match (numeral.rfind('.'), numeral.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let pos = dot.max(comma);
            (digits_only(&numeral[..pos]), numeral[pos + 1..].to_string())
        }
        (Some(pos), None) | (None, Some(pos)) => {
            let separator = &numeral[pos..pos + 1];
            let fraction = &numeral[pos + 1..];
            if numeral.matches(separator).count() > 1 || fraction.len() == 3 {
                (digits_only(numeral), String::new())
            } else {
                (numeral[..pos].to_string(), fraction.to_string())
            }
        }
        (None, None) => (numeral.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(raw: &str) -> Decimal {
        normalize(raw).unwrap().amount
    }

    #[test]
    fn euro_with_comma_decimal() {
        let price = normalize("€486,00").unwrap();
        assert_eq!(price.amount, Decimal::new(48600, 2));
        assert_eq!(price.display, "€486,00");
    }

    #[test]
    fn thousands_and_decimal_separators() {
        assert_eq!(amount("1.234,56"), Decimal::new(123456, 2));
        assert_eq!(amount("1,234.56"), Decimal::new(123456, 2));
        assert_eq!(amount("€ 1.299,99"), Decimal::new(129999, 2));
    }

    #[test]
    fn bare_integer() {
        let price = normalize("123").unwrap();
        assert_eq!(price.amount, Decimal::new(12300, 2));
        assert_eq!(price.display, "€123,00");
    }

    #[test]
    fn separator_is_positional() {
        assert_eq!(amount("123.45"), Decimal::new(12345, 2));
        assert_eq!(amount("123,45"), Decimal::new(12345, 2));
        assert_eq!(amount("19.9"), Decimal::new(1990, 2));
    }

    #[test]
    fn three_digit_groups_are_thousands() {
        assert_eq!(amount("1,234"), Decimal::from(1234));
        assert_eq!(amount("1.234.567"), Decimal::from(1234567));
    }

    #[test]
    fn markup_split_cents_with_currency() {
        assert_eq!(amount("€123 45"), Decimal::new(12345, 2));
        assert_eq!(amount("486 €"), Decimal::from(486));
    }

    #[test]
    fn non_breaking_spaces_are_stripped() {
        assert_eq!(amount("\u{a0}€\u{a0}480,00\u{a0}"), Decimal::from(480));
        assert_eq!(amount("&nbsp;€480,00"), Decimal::from(480));
    }

    #[test]
    fn first_amount_wins_at_this_level() {
        assert_eq!(amount("was €600 now €480"), Decimal::from(600));
    }

    #[test]
    fn unparsable_inputs() {
        assert!(matches!(normalize("Non disponibile"), Err(ExtractError::UnparsablePrice(_))));
        assert!(matches!(normalize(""), Err(ExtractError::UnparsablePrice(_))));
        assert!(matches!(normalize("€0,00"), Err(ExtractError::UnparsablePrice(_))));
    }

    #[test]
    fn display_round_trips() {
        for cents in [1_i64, 99, 100, 12345, 48000, 48600, 123456, 9_999_999] {
            let d = Decimal::new(cents, 2);
            assert_eq!(normalize(&display(d)).unwrap().amount, d, "cents = {}", cents);
        }
    }

    #[test]
    fn display_has_no_grouping() {
        assert_eq!(display(Decimal::new(123456, 2)), "€1234,56");
        assert_eq!(display(Decimal::from(7)), "€7,00");
    }
}
