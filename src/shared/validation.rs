use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for Brazilian company tax ids (CNPJ), punctuation optional
    /// - Valid: "37.097.718/0001-58", "37097718000158"
    /// - Invalid: "37.097.718/0001", "abc", "37-097-718-0001-58"
    pub static ref CNPJ_REGEX: Regex =
        Regex::new(r"^\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}$").unwrap();

    /// Loose phone format: digits, spaces, parentheses, plus and hyphen
    pub static ref PHONE_REGEX: Regex = Regex::new(r"^[0-9()+\- ]*$").unwrap();
}

/// Strip everything but digits so "37.097.718/0001-58" and "37097718000158" compare equal
pub fn normalize_cnpj(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}
