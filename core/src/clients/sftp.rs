//! SFTP access for batch file exchange.
//!
//! Every operation opens its own SSH session, performs one action and drops
//! the session. There is no pooling and host keys are not verified.

use crate::error::ChannelingResult;
use serde::{Deserialize, Serialize};
use ssh2::Session;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;

/// Remote file store the batch exchange works against.
pub trait RemoteFiles {
    fn upload(&self, remote_path: &str, contents: &[u8]) -> ChannelingResult<()>;
    fn download(&self, remote_path: &str) -> ChannelingResult<Vec<u8>>;
    /// File names (not paths) directly inside `remote_dir`.
    fn list(&self, remote_dir: &str) -> ChannelingResult<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SftpAuth {
    Password {
        #[serde(default)]
        password: String,
    },
    PrivateKey {
        path: String,
        #[serde(default)]
        passphrase: Option<String>,
    },
}

fn default_port() -> u16 {
    22
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SftpConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub auth: SftpAuth,
    #[serde(default)]
    pub remote_directory: Option<String>,
}

impl SftpConfig {
    /// `path` prefixed with the configured remote directory, if any.
    pub fn remote_path(&self, path: &str) -> String {
        match self.remote_directory.as_deref() {
            None | Some("") => path.to_string(),
            Some(dir) => format!("{}/{}", dir.trim_end_matches('/'), path.trim_start_matches('/')),
        }
    }
}

pub struct SftpClient {
    config: SftpConfig,
}

impl SftpClient {
    pub fn new(config: SftpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SftpConfig {
        &self.config
    }

    fn connect(&self) -> ChannelingResult<ssh2::Sftp> {
        let tcp = TcpStream::connect((self.config.host.as_str(), self.config.port))?;
        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;
        match &self.config.auth {
            SftpAuth::Password { password } => {
                session.userauth_password(&self.config.username, password)?;
            }
            SftpAuth::PrivateKey { path, passphrase } => {
                session.userauth_pubkey_file(
                    &self.config.username,
                    None,
                    Path::new(path),
                    passphrase.as_deref(),
                )?;
            }
        }
        log::debug!("sftp session opened to {}:{}", self.config.host, self.config.port);
        Ok(session.sftp()?)
    }
}

impl RemoteFiles for SftpClient {
    fn upload(&self, remote_path: &str, contents: &[u8]) -> ChannelingResult<()> {
        let path = self.config.remote_path(remote_path);
        let sftp = self.connect()?;
        let mut file = sftp.create(Path::new(&path))?;
        file.write_all(contents)?;
        log::info!("sftp upload {path} ({} bytes)", contents.len());
        Ok(())
    }

    fn download(&self, remote_path: &str) -> ChannelingResult<Vec<u8>> {
        let path = self.config.remote_path(remote_path);
        let sftp = self.connect()?;
        let mut file = sftp.open(Path::new(&path))?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        log::info!("sftp download {path} ({} bytes)", contents.len());
        Ok(contents)
    }

    fn list(&self, remote_dir: &str) -> ChannelingResult<Vec<String>> {
        let path = self.config.remote_path(remote_dir);
        let sftp = self.connect()?;
        let mut names: Vec<String> = sftp
            .readdir(Path::new(&path))?
            .into_iter()
            .filter(|(_, stat)| stat.is_file())
            .filter_map(|(p, _)| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_paths_join_onto_directory() {
        let mut config = SftpConfig {
            host: "sftp.partner.test".into(),
            port: 22,
            username: "julo".into(),
            auth: SftpAuth::Password { password: "x".into() },
            remote_directory: Some("/upload/".into()),
        };
        assert_eq!(config.remote_path("repayment/request/a.txt"), "/upload/repayment/request/a.txt");
        config.remote_directory = None;
        assert_eq!(config.remote_path("a.txt"), "a.txt");
    }
}
