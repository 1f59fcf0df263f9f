use serde::Serialize;

/// One rejected input field. `code` is stable so clients can localize it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, code: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            code,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Trims `value` and checks its length in characters. Records an error and
/// returns `None` on failure.
pub fn text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Option<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 && min > 0 {
        errors.add(field, "required", format!("{} cannot be empty", field));
        return None;
    }
    if len < min {
        errors.add(
            field,
            "too_short",
            format!("{} must be at least {} characters", field, min),
        );
        return None;
    }
    if len > max {
        errors.add(
            field,
            "too_long",
            format!("{} must be at most {} characters", field, max),
        );
        return None;
    }
    Some(trimmed.to_string())
}

/// Optional text: blank collapses to `None`.
pub fn optional_text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Option<String> {
    let value = value.map(str::trim).filter(|value| !value.is_empty())?;
    text(errors, field, value, 1, max)
}

/// Range check for numeric query parameters, falling back to `default`.
pub fn bounded(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<i64>,
    default: i64,
    min: i64,
    max: i64,
) -> i64 {
    let value = value.unwrap_or(default);
    if !(min..=max).contains(&value) {
        errors.add(
            field,
            "out_of_range",
            format!("{} must be between {} and {}", field, min, max),
        );
        return default;
    }
    value
}
