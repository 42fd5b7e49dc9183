use std::fmt;
use std::str::FromStr;

use crate::error::QandaError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Database(String);

impl Database {
    pub fn sra() -> Self {
        Self("sra".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_sra(&self) -> bool {
        self.0 == "sra"
    }

    pub fn is_biosample(&self) -> bool {
        self.0 == "biosample"
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Database {
    type Err = QandaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let is_valid = !normalized.is_empty()
            && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(QandaError::InvalidDatabase(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunAccession(String);

impl RunAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunAccession {
    type Err = QandaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(QandaError::InvalidRunAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_database_normalizes_case() {
        let db: Database = " SRA ".parse().unwrap();
        assert_eq!(db.as_str(), "sra");
        assert!(db.is_sra());
        assert!(!db.is_biosample());
    }

    #[test]
    fn parse_database_rejects_garbage() {
        let err = "s r a".parse::<Database>().unwrap_err();
        assert_matches!(err, QandaError::InvalidDatabase(_));

        let err = "".parse::<Database>().unwrap_err();
        assert_matches!(err, QandaError::InvalidDatabase(_));
    }

    #[test]
    fn parse_run_accession_valid() {
        let acc: RunAccession = "SRR000001".parse().unwrap();
        assert_eq!(acc.as_str(), "SRR000001");
    }

    #[test]
    fn parse_run_accession_invalid() {
        let err = "SRR 000001".parse::<RunAccession>().unwrap_err();
        assert_matches!(err, QandaError::InvalidRunAccession(_));

        let err = "".parse::<RunAccession>().unwrap_err();
        assert_matches!(err, QandaError::InvalidRunAccession(_));
    }
}
