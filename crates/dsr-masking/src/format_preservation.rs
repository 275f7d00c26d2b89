//! Preservación de formato: añade un sufijo fijo al valor enmascarado
//! (p.ej. `@masked.com` para que un email siga pareciendo un email).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatPreservation {
    pub suffix: String,
}

impl FormatPreservation {
    pub fn format(&self, value: &str) -> String {
        format!("{}{}", value, self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_suffix() {
        let fp = FormatPreservation { suffix: "@masked.com".into() };
        assert_eq!(fp.format("abc"), "abc@masked.com");
    }
}
