use super::error::UserError;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const AVATAR_PALETTE: [&str; 8] = [
    "#2563EB", "#7C3AED", "#DB2777", "#DC2626", "#EA580C", "#16A34A", "#0891B2", "#4B5563",
];

/// Validates a login name.
pub fn validate_username(username: &str) -> Result<(), UserError> {
    let len = username.chars().count();
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    if !(3..=32).contains(&len) || !username.chars().all(allowed) {
        return Err(UserError::InvalidUsername);
    }
    Ok(())
}

pub fn validate_full_name(full_name: &str) -> Result<(), UserError> {
    if full_name.trim().is_empty() {
        return Err(UserError::EmptyFullName);
    }
    Ok(())
}

/// Validates an email address shape: a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<(), UserError> {
    let invalid = || UserError::InvalidEmail(email.to_string());
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), UserError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Accepts `#RRGGBB` colors only.
pub fn validate_avatar_color(color: &str) -> Result<(), UserError> {
    match color.strip_prefix('#') {
        Some(hex) if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) => Ok(()),
        _ => Err(UserError::InvalidAvatarColor(color.to_string())),
    }
}

/// Uppercased first letters of the first two words of a name.
///
/// # Examples
///
/// ```
/// use dealflow_core::user::derive_initials;
///
/// assert_eq!(derive_initials("ada lovelace"), "AL");
/// assert_eq!(derive_initials("Plato"), "P");
/// assert_eq!(derive_initials("  "), "?");
/// ```
pub fn derive_initials(full_name: &str) -> String {
    let initials: String = full_name
        .split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect();
    if initials.is_empty() {
        "?".to_string()
    } else {
        initials
    }
}

/// Picks a palette color from the username so the same user always gets the same color.
pub fn avatar_color_for(username: &str) -> String {
    let hash = username
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
    AVATAR_PALETTE[(hash % AVATAR_PALETTE.len() as u64) as usize].to_string()
}
