use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::const_vars::REDACTED;
use crate::error::{Error, Result};

/// Where the table engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerType {
    #[default]
    Local,
    Remote,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Local => "LOCAL",
            ServerType::Remote => "REMOTE",
        }
    }
}

/// Index flavour of the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableType {
    #[default]
    Cdx,
    Ntx,
    Adt,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableType::Cdx => "CDX",
            TableType::Ntx => "NTX",
            TableType::Adt => "ADT",
        }
    }
}

impl FromStr for TableType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CDX" => Ok(TableType::Cdx),
            "NTX" => Ok(TableType::Ntx),
            "ADT" => Ok(TableType::Adt),
            other => Err(Error::InvalidConfig(format!("unknown table type {other}"))),
        }
    }
}

/// Connection settings handed to a table source when it is constructed.
///
/// The encryption password never shows up in `Debug` output or in
/// [`SourceConfig::redacted_connection_string`].
#[derive(Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Directory holding the tables.
    pub data_source: PathBuf,
    pub encryption_password: Option<String>,
    pub server_type: ServerType,
    pub table_type: TableType,
    /// Open tables in shared mode.
    pub shared: bool,
    /// Native engine library, for providers that load one.
    pub driver_path: Option<PathBuf>,
}

impl SourceConfig {
    pub fn new(data_source: impl Into<PathBuf>) -> Self {
        Self {
            data_source: data_source.into(),
            encryption_password: None,
            server_type: ServerType::default(),
            table_type: TableType::default(),
            shared: true,
            driver_path: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.encryption_password = Some(password.into());
        self
    }

    pub fn with_server_type(mut self, server_type: ServerType) -> Self {
        self.server_type = server_type;
        self
    }

    pub fn with_table_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    pub fn with_driver_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.driver_path = Some(path.into());
        self
    }

    /// Connection string in the form the native engine expects. Contains the
    /// password in clear text; log [`Self::redacted_connection_string`] instead.
    pub fn connection_string(&self) -> String {
        self.build_connection_string(self.encryption_password.as_deref())
    }

    pub fn redacted_connection_string(&self) -> String {
        self.build_connection_string(self.encryption_password.as_ref().map(|_| REDACTED))
    }

    fn build_connection_string(&self, password: Option<&str>) -> String {
        let mut out = format!(
            "data source={}; ServerType={}; TableType={}; Shared={};",
            self.data_source.display(),
            self.server_type.as_str(),
            self.table_type.as_str(),
            if self.shared { "TRUE" } else { "FALSE" },
        );
        if let Some(password) = password {
            out.push_str(&format!(" EncryptionPassword={password};"));
        }
        out
    }

    /// Check that the configured paths exist.
    pub fn validate(&self) -> Result<()> {
        if !self.data_source.exists() {
            return Err(Error::SourceUnavailable(format!(
                "data source {} does not exist",
                self.data_source.display()
            )));
        }
        if let Some(driver) = &self.driver_path {
            if !driver.is_file() {
                return Err(Error::InvalidConfig(format!(
                    "driver library {} not found",
                    driver.display()
                )));
            }
        }
        if matches!(&self.encryption_password, Some(p) if p.is_empty()) {
            return Err(Error::InvalidConfig(
                "encryption password is empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("data_source", &self.data_source)
            .field(
                "encryption_password",
                &self.encryption_password.as_ref().map(|_| REDACTED),
            )
            .field("server_type", &self.server_type)
            .field("table_type", &self.table_type)
            .field("shared", &self.shared)
            .field("driver_path", &self.driver_path)
            .finish()
    }
}
