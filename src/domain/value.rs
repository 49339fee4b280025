use std::fmt;

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Destination number together with its international direct-dialing (IDD) code.
///
/// Invariant: `idd_code` is `0` (unknown) or a positive code without leading `+`/`0`.
pub struct PhoneNumber {
    number: u64,
    idd_code: u32,
}

impl PhoneNumber {
    /// Field name used in validation errors.
    pub const FIELD: &'static str = "to";

    /// IDD code of mainland China.
    pub const CHINESE_MAINLAND: u32 = 86;

    /// Create a phone number from a national number and an IDD code string.
    ///
    /// Leading `+` and `0` characters are stripped from `idd_code` (`"+86"`, `"0086"` and `"86"`
    /// are equivalent). An empty `idd_code` leaves the code unknown (`0`).
    pub fn new(number: u64, idd_code: &str) -> Result<Self, ValidationError> {
        let input = idd_code.trim();
        if input.is_empty() {
            return Ok(Self::without_idd_code(number));
        }

        let digits = input.trim_start_matches(|c| c == '+' || c == '0');
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidIddCode {
                input: input.to_owned(),
            });
        }

        let idd_code = digits
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidIddCode {
                input: input.to_owned(),
            })?;

        Ok(Self { number, idd_code })
    }

    /// Create a phone number whose IDD code is unknown.
    pub fn without_idd_code(number: u64) -> Self {
        Self {
            number,
            idd_code: 0,
        }
    }

    /// Parse an international number such as `+8613800138000`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }

        let parsed =
            phonenumber::parse(None, raw).map_err(|_| ValidationError::InvalidPhoneNumber {
                input: raw.to_owned(),
            })?;

        Ok(Self {
            number: parsed.national().value(),
            idd_code: u32::from(parsed.code().value()),
        })
    }

    /// National number, e.g. `13800138000`.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// IDD code, e.g. `86`; `0` when unknown.
    pub fn idd_code(&self) -> u32 {
        self.idd_code
    }

    /// `+8613800138000`, or the bare number when the code is unknown.
    pub fn universal_number(&self) -> String {
        format!("{}{}", self.prefixed_idd_code("+"), self.number)
    }

    /// `008613800138000`, or the bare number when the code is unknown.
    pub fn zero_prefixed_number(&self) -> String {
        format!("{}{}", self.prefixed_idd_code("00"), self.number)
    }

    /// The IDD code behind `prefix` (`"+"` gives `+86`); empty when the code is unknown.
    pub fn prefixed_idd_code(&self, prefix: &str) -> String {
        if self.idd_code == 0 {
            return String::new();
        }
        format!("{prefix}{}", self.idd_code)
    }

    pub fn in_chinese_mainland(&self) -> bool {
        self.idd_code == Self::CHINESE_MAINLAND
    }

    /// Number with all but the last four digits hidden, for log output.
    pub(crate) fn masked(&self) -> String {
        let digits = self.number.to_string();
        let visible = digits.len().saturating_sub(4);
        format!(
            "{}{}{}",
            self.prefixed_idd_code("+"),
            "*".repeat(visible),
            &digits[visible..]
        )
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.universal_number())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Anything [`crate::SmsRelay::send`] accepts as a destination.
///
/// Plain integers and numeric strings carry no IDD code. Negative integers are rejected when
/// the destination is normalized.
pub enum Destination {
    Phone(PhoneNumber),
    Number(u64),
    Signed(i64),
    Raw(String),
}

impl Destination {
    /// Normalize into a [`PhoneNumber`].
    pub fn into_phone_number(self) -> Result<PhoneNumber, ValidationError> {
        match self {
            Self::Phone(phone) => Ok(phone),
            Self::Number(number) => Ok(PhoneNumber::without_idd_code(number)),
            Self::Signed(number) => u64::try_from(number)
                .map(PhoneNumber::without_idd_code)
                .map_err(|_| ValidationError::InvalidPhoneNumber {
                    input: number.to_string(),
                }),
            Self::Raw(raw) => {
                let trimmed = raw.trim();
                trimmed
                    .parse::<u64>()
                    .map(PhoneNumber::without_idd_code)
                    .map_err(|_| ValidationError::InvalidPhoneNumber {
                        input: trimmed.to_owned(),
                    })
            }
        }
    }
}

impl From<PhoneNumber> for Destination {
    fn from(value: PhoneNumber) -> Self {
        Self::Phone(value)
    }
}

impl From<u64> for Destination {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for Destination {
    fn from(value: u32) -> Self {
        Self::Number(u64::from(value))
    }
}

impl From<i64> for Destination {
    fn from(value: i64) -> Self {
        Self::Signed(value)
    }
}

/// Unsuffixed integer literals default to `i32`.
impl From<i32> for Destination {
    fn from(value: i32) -> Self {
        Self::Signed(i64::from(value))
    }
}

impl From<&str> for Destination {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_owned())
    }
}

impl From<String> for Destination {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idd_code_prefixes_are_stripped() {
        for code in ["+86", "0086", "86"] {
            let phone = PhoneNumber::new(18888888888, code).unwrap();
            assert_eq!(phone.idd_code(), 86);
            assert_eq!(phone.number(), 18888888888);
            assert_eq!(phone.universal_number(), "+8618888888888");
            assert_eq!(phone.zero_prefixed_number(), "008618888888888");
            assert_eq!(phone.prefixed_idd_code("+"), "+86");
            assert_eq!(phone.prefixed_idd_code("00"), "0086");
            assert_eq!(phone.to_string(), "+8618888888888");
            assert!(phone.in_chinese_mainland());
        }
    }

    #[test]
    fn unknown_idd_code_formats_without_prefix() {
        let phone = PhoneNumber::without_idd_code(18888888888);
        assert_eq!(phone.idd_code(), 0);
        assert_eq!(phone.prefixed_idd_code("+"), "");
        assert_eq!(phone.prefixed_idd_code("00"), "");
        assert_eq!(phone.universal_number(), "18888888888");
        assert_eq!(phone.zero_prefixed_number(), "18888888888");
        assert!(!phone.in_chinese_mainland());

        assert_eq!(PhoneNumber::new(18888888888, "").unwrap(), phone);
    }

    #[test]
    fn malformed_idd_code_is_rejected() {
        for code in ["iddcode86", "+", "000", "8a6", "-86"] {
            assert!(
                matches!(
                    PhoneNumber::new(18888888888, code),
                    Err(ValidationError::InvalidIddCode { .. })
                ),
                "{code} should be rejected"
            );
        }
    }

    #[test]
    fn non_mainland_code_is_kept() {
        let phone = PhoneNumber::new(2025550123, "+1").unwrap();
        assert_eq!(phone.universal_number(), "+12025550123");
        assert!(!phone.in_chinese_mainland());
    }

    #[test]
    fn parse_splits_international_number() {
        let phone = PhoneNumber::parse(" +8613800138000 ").unwrap();
        assert_eq!(phone.idd_code(), 86);
        assert_eq!(phone.number(), 13800138000);

        assert!(matches!(
            PhoneNumber::parse(""),
            Err(ValidationError::Empty { .. })
        ));
        assert!(matches!(
            PhoneNumber::parse("not-a-number"),
            Err(ValidationError::InvalidPhoneNumber { .. })
        ));
    }

    #[test]
    fn masked_keeps_last_four_digits() {
        let phone = PhoneNumber::new(18888881234, "86").unwrap();
        assert_eq!(phone.masked(), "+86*******1234");
        assert_eq!(PhoneNumber::without_idd_code(123).masked(), "123");
    }

    #[test]
    fn destination_normalizes_supported_shapes() {
        let phone = PhoneNumber::new(18888888888, "86").unwrap();
        assert_eq!(
            Destination::from(phone).into_phone_number().unwrap(),
            phone
        );
        assert_eq!(
            Destination::from(18888888888u64)
                .into_phone_number()
                .unwrap(),
            PhoneNumber::without_idd_code(18888888888)
        );
        assert_eq!(
            Destination::from(" 18888888888 ")
                .into_phone_number()
                .unwrap(),
            PhoneNumber::without_idd_code(18888888888)
        );
        assert!(matches!(
            Destination::from("188-8888".to_owned()).into_phone_number(),
            Err(ValidationError::InvalidPhoneNumber { .. })
        ));
    }

    #[test]
    fn destination_accepts_other_integer_widths() {
        assert_eq!(
            Destination::from(12345).into_phone_number().unwrap(),
            PhoneNumber::without_idd_code(12345)
        );
        assert_eq!(
            Destination::from(18888888888_i64)
                .into_phone_number()
                .unwrap(),
            PhoneNumber::without_idd_code(18888888888)
        );
        assert_eq!(
            Destination::from(4_000_000_000_u32)
                .into_phone_number()
                .unwrap(),
            PhoneNumber::without_idd_code(4_000_000_000)
        );
        assert_eq!(
            Destination::from(-5).into_phone_number(),
            Err(ValidationError::InvalidPhoneNumber {
                input: "-5".to_owned()
            })
        );
    }
}
