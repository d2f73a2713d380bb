use chrono::Utc;

use crate::model::db::petition::Petition;

use super::{required, required_email, FieldErrors, Validate};

/// The petition form as submitted. Fields are optional so that a missing
/// field is reported next to the field rather than failing the whole request.
///
/// `nombre` and `contenido` are accepted as well, as posted by older clients.
#[derive(Debug, Clone, Default, FromForm)]
pub struct PetitionForm {
    #[field(name = "name")]
    #[field(name = "nombre")]
    pub name: Option<String>,
    pub email: Option<String>,
    #[field(name = "content")]
    #[field(name = "contenido")]
    pub content: Option<String>,
}

impl Validate for PetitionForm {
    type Valid = Petition;

    fn validate(&self) -> Result<Petition, FieldErrors> {
        let mut errors = FieldErrors::default();
        let name = required(&mut errors, "name", self.name.as_deref());
        let email = required_email(&mut errors, "email", self.email.as_deref());
        let content = required(&mut errors, "content", self.content.as_deref());

        errors.or_valid(|| Petition {
            name,
            email,
            content,
            submitted_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl PetitionForm {
        pub fn example() -> Self {
            Self {
                name: Some("Ana".to_string()),
                email: Some("ana@example.com".to_string()),
                content: Some("Please add me to the census.".to_string()),
            }
        }
    }
}
