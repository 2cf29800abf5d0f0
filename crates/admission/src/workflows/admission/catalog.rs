use serde::{Deserialize, Serialize};

use super::domain::ProgramCode;

/// A study program candidates can register for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub code: ProgramCode,
    pub name: String,
    pub faculty: String,
}

/// In-memory catalog of study programs. Lookup is case-insensitive on the
/// code; the stored code (case preserved) is what ends up inside the NIM.
#[derive(Debug, Clone)]
pub struct ProgramCatalog {
    programs: Vec<Program>,
}

impl ProgramCatalog {
    pub fn new(programs: Vec<Program>) -> Self {
        Self { programs }
    }

    /// The programs offered by the registration office.
    pub fn seeded() -> Self {
        let program = |code: &str, name: &str, faculty: &str| Program {
            code: ProgramCode(code.to_string()),
            name: name.to_string(),
            faculty: faculty.to_string(),
        };

        Self::new(vec![
            program("TIF", "Teknik Informatika", "FTI"),
            program("SI", "Sistem Informasi", "FTI"),
            program("FARM", "Farmasi", "FIKES"),
            program("MESIN", "Teknik Mesin", "FT"),
        ])
    }

    pub fn find(&self, code: &str) -> Option<&Program> {
        let wanted = code.trim();
        self.programs
            .iter()
            .find(|program| program.code.as_str().eq_ignore_ascii_case(wanted))
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }
}

impl Default for ProgramCatalog {
    fn default() -> Self {
        Self::seeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_is_case_insensitive_but_preserves_stored_code() {
        let catalog = ProgramCatalog::seeded();
        let program = catalog.find(" tif ").expect("TIF is seeded");
        assert_eq!(program.code.as_str(), "TIF");
        assert_eq!(program.name, "Teknik Informatika");
    }

    #[test]
    fn unknown_code_returns_none() {
        let catalog = ProgramCatalog::seeded();
        assert!(catalog.find("HUKUM").is_none());
    }
}
