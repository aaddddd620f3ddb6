//! RUT (Rol Único Tributario) check digits, validation and formatting.
//!
//! Free-form text goes through [`clean`] first; every other text operation
//! here cleans its input itself. Malformed text never panics or errors, it
//! produces a structured result with `valid: false`.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::SiiError;

/// Lower bound (inclusive) for [`generate_random`] bodies.
pub const RANDOM_BODY_MIN: u64 = 5_000_000;

/// Upper bound (exclusive) for [`generate_random`] bodies.
pub const RANDOM_BODY_MAX: u64 = 25_000_000;

pub const MESSAGE_VALID: &str = "RUT válido";
pub const MESSAGE_MISMATCH: &str = "DV incorrecto";
pub const MESSAGE_MALFORMED: &str = "Formato inválido";

/// Verifier character (DV): a decimal digit or `K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckDigit {
    Digit(u8),
    K,
}

impl CheckDigit {
    pub fn as_char(self) -> char {
        match self {
            Self::Digit(d) => char::from(b'0' + d),
            Self::K => 'K',
        }
    }

    /// Parse a single DV character; lowercase `k` is accepted.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => Some(Self::Digit(c as u8 - b'0')),
            'K' | 'k' => Some(Self::K),
            _ => None,
        }
    }
}

impl fmt::Display for CheckDigit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Serialize for CheckDigit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Compute the modulo-11 check digit for a RUT body.
///
/// Digits are weighted 2, 3, 4, 5, 6, 7 (then 2 again) starting from the
/// least significant one; `11 - sum % 11` maps 11 to `0` and 10 to `K`.
pub fn calculate_check_digit(body: u64) -> CheckDigit {
    let mut sum = 0u64;
    let mut multiplier = 2u64;
    let mut rest = body;
    loop {
        sum += (rest % 10) * multiplier;
        multiplier = if multiplier == 7 { 2 } else { multiplier + 1 };
        rest /= 10;
        if rest == 0 {
            break;
        }
    }
    match 11 - (sum % 11) {
        11 => CheckDigit::Digit(0),
        10 => CheckDigit::K,
        r => CheckDigit::Digit(r as u8),
    }
}

/// Strip `.` and `-` and uppercase.
pub fn clean(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '.' && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Format an already cleaned RUT (`body` + DV) as `12.345.678-5`.
///
/// The body is grouped in blocks of three from the right. No check-digit
/// validation happens here.
pub fn canonical_format(cleaned: &str) -> String {
    let (body, check) = split_last(cleaned);
    format!("{}-{}", group_thousands(body, '.'), check)
}

/// Insert `sep` every three characters counting from the right.
pub(crate) fn group_thousands(digits: &str, sep: char) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / 3);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(*c);
    }
    out
}

fn split_last(cleaned: &str) -> (&str, &str) {
    match cleaned.char_indices().last() {
        Some((idx, _)) => (&cleaned[..idx], &cleaned[idx..]),
        None => ("", ""),
    }
}

/// Split a cleaned RUT into numeric body and DV when it is structurally
/// valid: one or more digits followed by exactly one digit or `K`.
fn parse_structure(cleaned: &str) -> Option<(u64, CheckDigit)> {
    let (body, check) = split_last(cleaned);
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let check = check.chars().next().and_then(CheckDigit::from_char)?;
    // Bodies beyond u64 are not RUTs; treat them as malformed.
    let body = body.parse::<u64>().ok()?;
    Some((body, check))
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RutValidation {
    pub valid: bool,
    /// Canonical form of the supplied text; absent when malformed.
    pub canonical: Option<String>,
    /// DV computed from the body; absent when malformed.
    pub check_digit: Option<CheckDigit>,
    pub message: String,
}

/// Validate free-form RUT text.
pub fn validate(input: &str) -> RutValidation {
    let cleaned = clean(input);
    let Some((body, supplied)) = parse_structure(&cleaned) else {
        return RutValidation {
            valid: false,
            canonical: None,
            check_digit: None,
            message: MESSAGE_MALFORMED.into(),
        };
    };

    let expected = calculate_check_digit(body);
    let valid = expected == supplied;
    RutValidation {
        valid,
        canonical: Some(canonical_format(&cleaned)),
        check_digit: Some(expected),
        message: if valid { MESSAGE_VALID } else { MESSAGE_MISMATCH }.into(),
    }
}

/// Result of [`format`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RutFormatted {
    pub original: String,
    pub canonical: String,
    pub cleaned: String,
}

/// Clean and canonically format, without checking the DV.
pub fn format(input: &str) -> RutFormatted {
    let cleaned = clean(input);
    RutFormatted {
        original: input.to_string(),
        canonical: canonical_format(&cleaned),
        cleaned,
    }
}

/// Result of [`strip`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RutParts {
    pub original: String,
    pub cleaned: String,
    pub body: String,
    pub check_digit: String,
}

/// Clean and split into body and DV text, without validation.
pub fn strip(input: &str) -> RutParts {
    let cleaned = clean(input);
    let (body, check) = split_last(&cleaned);
    RutParts {
        original: input.to_string(),
        body: body.to_string(),
        check_digit: check.to_string(),
        cleaned,
    }
}

/// A RUT built forward from its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RutComputed {
    pub body: u64,
    pub check_digit: CheckDigit,
    /// `body-DV`, e.g. `12345678-5`.
    pub combined: String,
    /// `12.345.678-5`.
    pub canonical: String,
}

pub fn compute_for_body(body: u64) -> RutComputed {
    let rut = Rut::from_body(body);
    RutComputed {
        body,
        check_digit: rut.check_digit,
        combined: rut.compact(),
        canonical: rut.canonical(),
    }
}

/// Random valid RUT with a body in `[5_000_000, 25_000_000)`.
pub fn generate_random() -> RutComputed {
    generate_random_with(&mut rand::thread_rng())
}

/// Like [`generate_random`] with a caller-supplied generator.
pub fn generate_random_with<R: Rng>(rng: &mut R) -> RutComputed {
    compute_for_body(rng.gen_range(RANDOM_BODY_MIN..RANDOM_BODY_MAX))
}

/// A structurally valid RUT whose DV matches its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rut {
    body: u64,
    check_digit: CheckDigit,
}

impl Rut {
    pub fn from_body(body: u64) -> Self {
        Self {
            body,
            check_digit: calculate_check_digit(body),
        }
    }

    pub fn body(&self) -> u64 {
        self.body
    }

    pub fn check_digit(&self) -> CheckDigit {
        self.check_digit
    }

    /// `12345678-5`, the form the invoicing providers expect.
    pub fn compact(&self) -> String {
        format!("{}-{}", self.body, self.check_digit)
    }

    /// `12.345.678-5`.
    pub fn canonical(&self) -> String {
        format!(
            "{}-{}",
            group_thousands(&self.body.to_string(), '.'),
            self.check_digit
        )
    }
}

impl FromStr for Rut {
    type Err = SiiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = clean(s);
        let (body, supplied) = parse_structure(&cleaned)
            .ok_or_else(|| SiiError::Validation(format!("RUT '{s}': {MESSAGE_MALFORMED}")))?;
        let rut = Rut::from_body(body);
        if rut.check_digit != supplied {
            return Err(SiiError::Validation(format!(
                "RUT '{s}': {MESSAGE_MISMATCH} (expected {})",
                rut.check_digit
            )));
        }
        Ok(rut)
    }
}

impl fmt::Display for Rut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl Serialize for Rut {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.compact())
    }
}

impl<'de> Deserialize<'de> for Rut {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    // --- check digit ---

    #[test]
    fn known_check_digits() {
        assert_eq!(calculate_check_digit(12_345_678), CheckDigit::Digit(5));
        assert_eq!(calculate_check_digit(66_666_666), CheckDigit::Digit(6));
        assert_eq!(calculate_check_digit(11_111_111), CheckDigit::Digit(1));
        assert_eq!(calculate_check_digit(76_123_456), CheckDigit::Digit(0));
    }

    #[test]
    fn check_digit_k() {
        assert_eq!(calculate_check_digit(8_765_432), CheckDigit::K);
        assert_eq!(calculate_check_digit(6), CheckDigit::K);
    }

    #[test]
    fn check_digit_small_bodies() {
        assert_eq!(calculate_check_digit(0), CheckDigit::Digit(0));
        assert_eq!(calculate_check_digit(1), CheckDigit::Digit(9));
        assert_eq!(calculate_check_digit(10), CheckDigit::Digit(8));
    }

    // --- clean / format ---

    #[test]
    fn clean_strips_dots_and_dashes() {
        assert_eq!(clean("8.765.432-k"), "8765432K");
        assert_eq!(clean("12345678-5"), "123456785");
    }

    #[test]
    fn canonical_groups_from_the_right() {
        assert_eq!(canonical_format("123456785"), "12.345.678-5");
        assert_eq!(canonical_format("1234567"), "123.456-7");
        assert_eq!(canonical_format("19"), "1-9");
    }

    #[test]
    fn canonical_of_empty_input() {
        assert_eq!(canonical_format(""), "-");
    }

    #[test]
    fn group_thousands_for_money() {
        assert_eq!(group_thousands("1234567", '.'), "1.234.567");
        assert_eq!(group_thousands("999", '.'), "999");
    }

    // --- validate ---

    #[test]
    fn validate_accepts_correct_dv() {
        let v = validate("12345678-5");
        assert!(v.valid);
        assert_eq!(v.canonical.as_deref(), Some("12.345.678-5"));
        assert_eq!(v.check_digit, Some(CheckDigit::Digit(5)));
        assert_eq!(v.message, MESSAGE_VALID);
    }

    #[test]
    fn validate_reports_mismatch_with_computed_dv() {
        let v = validate("12345678-9");
        assert!(!v.valid);
        assert_eq!(v.check_digit, Some(CheckDigit::Digit(5)));
        assert_eq!(v.canonical.as_deref(), Some("12.345.678-9"));
        assert_eq!(v.message, MESSAGE_MISMATCH);
    }

    #[test]
    fn validate_lowercase_k() {
        assert!(validate("8.765.432-k").valid);
    }

    #[test]
    fn validate_malformed_inputs() {
        for input in ["abc", "", "5", "1234K5", "12345678-KK", "12 345 678-5"] {
            let v = validate(input);
            assert!(!v.valid, "{input:?} should be malformed");
            assert!(v.canonical.is_none());
            assert_eq!(v.message, MESSAGE_MALFORMED);
        }
    }

    #[test]
    fn validate_huge_body_is_malformed() {
        let v = validate("123456789012345678901234-5");
        assert!(!v.valid);
        assert_eq!(v.message, MESSAGE_MALFORMED);
    }

    // --- strip / compute / random ---

    #[test]
    fn strip_splits_without_validating() {
        let p = strip("12.345.678-9");
        assert_eq!(p.cleaned, "123456789");
        assert_eq!(p.body, "12345678");
        assert_eq!(p.check_digit, "9");
    }

    #[test]
    fn compute_for_body_builds_both_forms() {
        let c = compute_for_body(12_345_678);
        assert_eq!(c.combined, "12345678-5");
        assert_eq!(c.canonical, "12.345.678-5");
    }

    #[test]
    fn random_bodies_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let c = generate_random_with(&mut rng);
            assert!((RANDOM_BODY_MIN..RANDOM_BODY_MAX).contains(&c.body));
            assert_eq!(c.check_digit, calculate_check_digit(c.body));
        }
    }

    // --- Rut type ---

    #[test]
    fn rut_parse_and_display() {
        let rut: Rut = "12.345.678-5".parse().unwrap();
        assert_eq!(rut.body(), 12_345_678);
        assert_eq!(rut.to_string(), "12.345.678-5");
        assert_eq!(rut.compact(), "12345678-5");
    }

    #[test]
    fn rut_parse_rejects_wrong_dv() {
        let err = "12345678-9".parse::<Rut>().unwrap_err().to_string();
        assert!(err.contains(MESSAGE_MISMATCH));
    }

    #[test]
    fn check_digit_serializes_as_string() {
        let json = serde_json::to_string(&CheckDigit::K).unwrap();
        assert_eq!(json, "\"K\"");
    }
}
