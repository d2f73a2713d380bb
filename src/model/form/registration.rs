use super::{required, required_email, FieldErrors, Validate, REQUIRED};

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn’t match.";
pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const PASSWORD_TOO_SHORT: &str =
    "This password is too short. It must contain at least 8 characters.";
pub const PASSWORD_NUMERIC: &str = "This password is entirely numeric.";
pub const PASSWORD_LIKE_USERNAME: &str = "The password is too similar to the username.";

/// The sign-up form as submitted.
#[derive(Debug, Clone, Default, FromForm)]
pub struct RegistrationForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
}

/// A registration that passed every check not needing the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegistrationForm {
    type Valid = NewUser;

    /// Username uniqueness is checked by the caller against the user store.
    fn validate(&self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::default();

        let username = required(&mut errors, "username", self.username.as_deref());
        let length = username.chars().count();
        if length > USERNAME_MAX_LENGTH {
            errors.add(
                "username",
                format!("Ensure this value has at most {USERNAME_MAX_LENGTH} characters (it has {length})."),
            );
        }
        if !username.chars().all(is_username_char) {
            errors.add("username", INVALID_USERNAME);
        }

        let email = required_email(&mut errors, "email", self.email.as_deref());

        // Passwords are taken verbatim, whitespace included.
        let password1 = self.password1.clone().unwrap_or_default();
        let password2 = self.password2.clone().unwrap_or_default();
        if password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if password2.is_empty() {
            errors.add("password2", REQUIRED);
        }
        if !password1.is_empty() && !password2.is_empty() {
            if password1 != password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else {
                check_password_strength(&mut errors, &password2, &username);
            }
        }

        errors.or_valid(|| NewUser {
            username,
            email,
            password: password1,
        })
    }
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

/// Strength problems are reported against the confirmation field.
fn check_password_strength(errors: &mut FieldErrors, password: &str, username: &str) {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        errors.add("password2", PASSWORD_TOO_SHORT);
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.add("password2", PASSWORD_NUMERIC);
    }
    if !username.is_empty() && password.to_lowercase() == username.to_lowercase() {
        errors.add("password2", PASSWORD_LIKE_USERNAME);
    }
}
