// src/common/validation.rs

use validator::ValidationError;

/// Regra `custom` do validator: texto obrigatório que não pode ser só espaço.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("FIELD_REQUIRED".into());
        return Err(err);
    }
    Ok(())
}
