use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveTime;
use regex::Regex;
use rust_decimal::Decimal;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{RawPrice, ReviewVector},
};

/**
 * Currency glyphs removed from price text.
 */
const CURRENCY_GLYPHS: [char; 3] = ['đ', '₫', 'Đ'];

/**
 * Thousands separators removed from price text. Neither is ever a decimal point.
 */
const PRICE_SEPARATORS: [char; 2] = ['.', ','];

/**
 * Format of a shift boundary.
 */
const SHIFT_TIME_FORMAT: &str = "%H:%M";

/**
 * Precision review scores are stored with.
 */
const REVIEW_DECIMALS: u32 = 2;

/**
 * Emoji ranges removed by `strip_emoji`.
 */
const EMOJI_PATTERN: &str = "[\u{1F600}-\u{1F64F}\u{1F300}-\u{1F5FF}\u{1F680}-\u{1F6FF}\u{1F1E0}-\u{1F1FF}\u{2702}-\u{27B0}\u{24C2}-\u{1F251}]+";

/**
 * The five rated aspects of a diner, in review vector order.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAspect {
    Quality,
    Price,
    Service,
    Location,
    Ambience,
}

impl ReviewAspect {
    /**
     * Looks up the aspect of a review label. Labels are the ones used by the review site, the English names are accepted as well.
     *
     * # Arguments
     * `label`: Review label from the source record.
     *
     * # Returns
     * The aspect, or `None` for labels outside the known set.
     */
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Chất lượng" | "quality" => Some(ReviewAspect::Quality),
            "Giá cả" | "price" => Some(ReviewAspect::Price),
            "Phục vụ" | "service" => Some(ReviewAspect::Service),
            "Vị trí" | "location" => Some(ReviewAspect::Location),
            "Không gian" | "ambience" => Some(ReviewAspect::Ambience),
            _ => None,
        }
    }

    /**
     * Slot of the aspect in the review vector.
     */
    pub fn slot(self) -> usize {
        match self {
            ReviewAspect::Quality => 0,
            ReviewAspect::Price => 1,
            ReviewAspect::Service => 2,
            ReviewAspect::Location => 3,
            ReviewAspect::Ambience => 4,
        }
    }
}

/**
 * Converts a scraped price into whole currency units.
 *
 * # Arguments
 * `raw`: Price text such as `"150.000đ"` or a JSON number.
 *
 * # Returns
 * The price, or an `ApplicationError` of type `MalformedPrice`.
 */
pub fn normalize_price(raw: &RawPrice) -> Result<i64, ApplicationError> {
    match raw {
        RawPrice::Number(number) => {
            if let Some(value) = number.as_i64() {
                if value < 0 {
                    return Err(malformed_price(&number.to_string()));
                }
                return Ok(value);
            }
            match number.as_f64() {
                #[allow(clippy::cast_possible_truncation)]
                Some(value) if value >= 0.0 && value.fract() == 0.0 && value < i64::MAX as f64 => Ok(value as i64),
                _ => Err(malformed_price(&number.to_string())),
            }
        }
        RawPrice::Text(text) => {
            let digits: String = text.trim().chars().filter(|c| !CURRENCY_GLYPHS.contains(c) && !PRICE_SEPARATORS.contains(c)).collect();
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(malformed_price(text));
            }
            digits.parse::<i64>().map_err(|err| ApplicationError::new(ErrorType::MalformedPrice, format!("Price {text} out of range: {err}")))
        }
        RawPrice::Other(value) => Err(malformed_price(&value.to_string())),
    }
}

fn malformed_price(text: &str) -> ApplicationError {
    ApplicationError::new(ErrorType::MalformedPrice, format!("Malformed price {text}"))
}

/**
 * Orders labeled review scores into the fixed review vector. Unknown labels are ignored and
 * scores that are null or not numeric leave their slot unrated.
 *
 * # Arguments
 * `entries`: Single key maps of review label to score, in any order.
 *
 * # Returns
 * Scores for quality, price, service, location and ambience rounded to two decimals.
 */
pub fn normalize_review_vector(entries: &[HashMap<String, serde_json::Value>]) -> ReviewVector {
    let mut review: ReviewVector = [None; 5];
    for (label, score) in entries.iter().flat_map(|entry| entry.iter()) {
        let Some(aspect) = ReviewAspect::from_label(label) else {
            tracing::trace!("Ignoring unknown review label {}", label);
            continue;
        };
        review[aspect.slot()] = review_score(score);
    }
    review
}

fn review_score(score: &serde_json::Value) -> Option<Decimal> {
    let text = match score {
        serde_json::Value::Number(number) => number.to_string(),
        serde_json::Value::String(text) => text.trim().to_string(),
        _ => return None,
    };
    let decimal = Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text));
    match decimal {
        Ok(decimal) => {
            let mut score = decimal.round_dp(REVIEW_DECIMALS);
            score.rescale(REVIEW_DECIMALS);
            Some(score)
        }
        Err(err) => {
            tracing::debug!("Review score {} is not a number: {}", text, err);
            None
        }
    }
}

/**
 * Splits an opening shift into start and end time.
 *
 * # Arguments
 * `raw`: Shift text such as `"08:00-14:00"`.
 *
 * # Returns
 * Start and end time, or an `ApplicationError` of type `MalformedShift`.
 */
pub fn normalize_shift(raw: &str) -> Result<(NaiveTime, NaiveTime), ApplicationError> {
    let marks: Vec<&str> = raw.split('-').collect();
    let [start, close] = marks.as_slice() else {
        return Err(ApplicationError::new(ErrorType::MalformedShift, format!("Shift {raw} does not have exactly one separator")));
    };
    Ok((parse_shift_time(raw, start)?, parse_shift_time(raw, close)?))
}

fn parse_shift_time(raw: &str, token: &str) -> Result<NaiveTime, ApplicationError> {
    NaiveTime::parse_from_str(token.trim(), SHIFT_TIME_FORMAT).map_err(|err| ApplicationError::new(ErrorType::MalformedShift, format!("Shift {raw} has invalid time {token}: {err}")))
}

/**
 * Removes emoji from free text.
 *
 * # Arguments
 * `text`: Text to clean, passed through when `None`.
 *
 * # Returns
 * The text without emoji.
 */
pub fn strip_emoji(text: Option<&str>) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let text = text?;
    let re = RE.get_or_init(|| Regex::new(EMOJI_PATTERN).expect("emoji pattern is valid"));
    Some(re.replace_all(text, "").into_owned())
}
