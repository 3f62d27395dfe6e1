use crate::{
    clients::{BssConfig, DbsConfig, SftpAuth, SftpConfig, SmfConfig},
    context::Context,
    error::{ChannelingError, ChannelingResult, MappingError},
    files::{FileFormat, FileLayout, FilenamePattern, FixedWidthLayout},
    mapping::{DataType, FieldMapping, MappingTable, Padding},
    transform::TransformId,
    types::ChannelingType,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

pub const ENV_BSS_USER: &str = "CHANNELING_BSS_USER";
pub const ENV_DBS_API_KEY: &str = "CHANNELING_DBS_API_KEY";
pub const ENV_SMF_SECRET_KEY: &str = "CHANNELING_SMF_SECRET_KEY";
pub const ENV_SFTP_PASSWORD: &str = "CHANNELING_SFTP_PASSWORD";

fn default_contract_prefix() -> String {
    "JUL".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct PartnersFile {
    #[serde(default = "default_contract_prefix")]
    contract_prefix: String,
    #[serde(default)]
    bss: Option<BssConfig>,
    #[serde(default)]
    dbs: Option<DbsConfig>,
    #[serde(default)]
    smf: Option<SmfConfig>,
    #[serde(default)]
    sftp: HashMap<ChannelingType, SftpConfig>,
}

/// Partner endpoints, compiled mapping tables and batch file layouts.
///
/// Loaded once at startup and passed explicitly to whatever builds clients;
/// nothing reads configuration from global state.
#[derive(Debug, Clone)]
pub struct ChannelingConfig {
    pub contract_prefix: String,
    pub bss: Option<BssConfig>,
    pub dbs: Option<DbsConfig>,
    pub smf: Option<SmfConfig>,
    pub sftp: HashMap<ChannelingType, SftpConfig>,
    pub mappings: HashMap<String, MappingTable>,
    pub layouts: HashMap<String, FileLayout>,
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))
}

/// `*.json` files in `dir`, sorted, as (file stem, path). A missing
/// directory is treated as empty.
fn json_files(dir: &Path) -> anyhow::Result<Vec<(String, std::path::PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

impl ChannelingConfig {
    /// Read `partners.json`, `mappings/*.json` and `layouts/*.json` under
    /// `data_dir`, then apply secret overrides from the environment.
    /// Mapping tables are compiled here, so a bad table fails the load.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let root = Path::new(data_dir);

        let partners_path = root.join("partners.json");
        let partners: PartnersFile = serde_json::from_str(&read(&partners_path)?)
            .map_err(|e| anyhow::anyhow!("Invalid {}: {e}", partners_path.display()))?;

        let mut mappings = HashMap::new();
        for (name, path) in json_files(&root.join("mappings"))? {
            let raw: serde_json::Value = serde_json::from_str(&read(&path)?)?;
            let table = MappingTable::from_json(&raw)
                .map_err(|e| anyhow::anyhow!("Mapping table '{name}': {e}"))?;
            log::debug!("loaded mapping table {name} ({} keys)", table.len());
            mappings.insert(name, table);
        }

        let mut layouts = HashMap::new();
        for (name, path) in json_files(&root.join("layouts"))? {
            let layout: FileLayout = serde_json::from_str(&read(&path)?)
                .map_err(|e| anyhow::anyhow!("Invalid {}: {e}", path.display()))?;
            layouts.insert(name, layout);
        }

        let mut config = Self {
            contract_prefix: partners.contract_prefix,
            bss: partners.bss,
            dbs: partners.dbs,
            smf: partners.smf,
            sftp: partners.sftp,
            mappings,
            layouts,
        };
        config.validate().map_err(|e| anyhow::anyhow!("{e}"))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        log::info!(
            "loaded channeling config: {} mapping tables, {} layouts",
            config.mappings.len(),
            config.layouts.len()
        );
        Ok(config)
    }

    /// Replace secrets with values from `lookup` (the environment in
    /// production). Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let (Some(bss), Some(user)) = (self.bss.as_mut(), get(ENV_BSS_USER)) {
            bss.user = Some(user);
        }
        if let (Some(dbs), Some(key)) = (self.dbs.as_mut(), get(ENV_DBS_API_KEY)) {
            dbs.api_key = key;
        }
        if let (Some(smf), Some(secret)) = (self.smf.as_mut(), get(ENV_SMF_SECRET_KEY)) {
            smf.secret_key = secret;
        }
        if let Some(password) = get(ENV_SFTP_PASSWORD) {
            for sftp in self.sftp.values_mut() {
                if let SftpAuth::Password { password: p } = &mut sftp.auth {
                    *p = password.clone();
                }
            }
        }
    }

    /// Every layout must name a mapping table that exists.
    pub fn validate(&self) -> ChannelingResult<()> {
        for (name, layout) in &self.layouts {
            if !self.mappings.contains_key(&layout.table) {
                return Err(ChannelingError::Config(format!(
                    "layout '{name}' uses unknown mapping table '{}'",
                    layout.table
                )));
            }
        }
        Ok(())
    }

    pub fn mapping(&self, name: &str) -> ChannelingResult<&MappingTable> {
        self.mappings
            .get(name)
            .ok_or_else(|| ChannelingError::Config(format!("unknown mapping table '{name}'")))
    }

    pub fn layout(&self, name: &str) -> ChannelingResult<&FileLayout> {
        self.layouts
            .get(name)
            .ok_or_else(|| ChannelingError::Config(format!("unknown file layout '{name}'")))
    }

    pub fn sftp_for(&self, channeling_type: ChannelingType) -> ChannelingResult<&SftpConfig> {
        self.sftp
            .get(&channeling_type)
            .ok_or_else(|| ChannelingError::Config(format!("no SFTP settings for {channeling_type}")))
    }

    /// Entries every resolution context starts from.
    pub fn base_context(&self) -> Context {
        Context::new().with(
            "channeling_loan_config",
            json!({ "contract_prefix": self.contract_prefix }),
        )
    }

    /// Small in-code configuration for tests.
    pub fn default_test() -> Self {
        let mut mappings = HashMap::new();
        mappings.insert(
            "dbs_loan_application".to_string(),
            test_dbs_table().expect("literal test paths parse"),
        );
        mappings.insert(
            "permata_disbursement".to_string(),
            test_fixed_width_table().expect("literal test paths parse"),
        );

        let mut layouts = HashMap::new();
        layouts.insert(
            "permata_disbursement".to_string(),
            FileLayout {
                channeling_type: ChannelingType::Permata,
                table: "permata_disbursement".into(),
                format: FileFormat::FixedWidth,
                request_dir: "disbursement/request".into(),
                approval_dir: "disbursement/approval".into(),
                filename: FilenamePattern::new("JUL_DISBURSEMENT_{date}{counter}.txt"),
                approval: FixedWidthLayout::new()
                    .column("contract_code", 0, 15)
                    .column("status", 15, 2)
                    .column("reason", 17, 40),
            },
        );

        let mut sftp = HashMap::new();
        sftp.insert(
            ChannelingType::Permata,
            SftpConfig {
                host: "127.0.0.1".into(),
                port: 22,
                username: "julo".into(),
                auth: SftpAuth::Password {
                    password: String::new(),
                },
                remote_directory: None,
            },
        );

        Self {
            contract_prefix: default_contract_prefix(),
            bss: Some(BssConfig {
                base_url: "http://bss.test".into(),
                user: Some("julo".into()),
                timeout_secs: crate::clients::bss::DEFAULT_TIMEOUT_SECS,
                mock: Default::default(),
            }),
            dbs: Some(DbsConfig {
                base_url: "http://dbs.test".into(),
                org_id: "JULO".into(),
                api_key: "test-key".into(),
            }),
            smf: Some(SmfConfig {
                base_url: "http://smf.test".into(),
                access_key: "test-access".into(),
                secret_key: "test-secret".into(),
            }),
            sftp,
            mappings,
            layouts,
        }
    }
}

fn test_dbs_table() -> Result<MappingTable, MappingError> {
    let path = |expr: &str| FieldMapping::path(expr);
    Ok(MappingTable::new()
        .field(
            "contract_code",
            path("loan.loan_xid")?.required().transform(TransformId::GetContractCode),
        )
        .field("applicant_name", path("customer.fullname")?.required().length(50))
        .field("gender", path("customer.gender")?.transform(TransformId::GetGender))
        .field(
            "annual_income",
            path("customer.monthly_income*12")?.data_type(DataType::Int),
        )
        .null("collateral"))
}

fn test_fixed_width_table() -> Result<MappingTable, MappingError> {
    Ok(MappingTable::new()
        .field(
            "contract_code",
            FieldMapping::path("loan.loan_xid")?
                .required()
                .transform(TransformId::GetContractCode)
                .length(15),
        )
        .field(
            "name",
            FieldMapping::path("customer.fullname")?
                .required()
                .length(30)
                .padding(Padding::Word),
        )
        .field(
            "amount",
            FieldMapping::path("loan.loan_amount")?
                .data_type(DataType::Int)
                .length(12),
        ))
}
