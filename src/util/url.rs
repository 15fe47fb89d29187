//
//  Copyright (C) 2022-2024  Chase Ruskin
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use std::{num::ParseIntError, str::FromStr};
use url::ParseError;
use url::Url as CrateUrl;

/// A remote repository location written as either an https or an ssh url.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub enum Url {
    Https(Https),
    Ssh(Ssh),
}

impl Url {
    /// Casts the url to https.
    pub fn as_https(&self) -> Https {
        match self {
            Self::Https(url) => url.to_owned(),
            Self::Ssh(url) => url.to_https(),
        }
    }

    /// Computes the canonical `host/path` form of the url.
    ///
    /// Both spellings of the same repository (ssh and https, with or without a
    /// trailing `.git`) produce the same canonical string.
    pub fn canonical(&self) -> String {
        let https = self.as_https();
        // the inner string was produced by the url crate so it always reparses
        match CrateUrl::from_str(&https.0) {
            Ok(url) => {
                let mut host = url.host_str().unwrap_or_default().to_ascii_lowercase();
                if let Some(port) = url.port() {
                    host.push_str(&format!(":{}", port));
                }
                format!("{}/{}", host, trim_repo_path(url.path()))
            }
            Err(_) => trim_repo_path(&https.0),
        }
    }
}

/// Strips the surrounding slashes and a trailing `.git` from a repository path.
pub fn trim_repo_path(path: &str) -> String {
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    path.trim_end_matches('/').to_string()
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum UrlError {
    #[error("{0}")]
    SshError(SshError),
    #[error("{0}")]
    HttpsError(ParseError),
}

impl FromStr for Url {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // check for https:// base
        if let Some((base, _)) = s.split_once("://") {
            if base.eq_ignore_ascii_case("https") || base.eq_ignore_ascii_case("http") {
                match Https::from_str(s) {
                    Ok(r) => Ok(Self::Https(r)),
                    Err(e) => Err(Self::Err::HttpsError(e)),
                }
            } else {
                match Ssh::from_str(s) {
                    Ok(r) => Ok(Self::Ssh(r)),
                    Err(e) => Err(Self::Err::SshError(e)),
                }
            }
        } else {
            match Ssh::from_str(s) {
                Ok(r) => Ok(Self::Ssh(r)),
                Err(e) => Err(Self::Err::SshError(e)),
            }
        }
    }
}

impl std::fmt::Display for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Https(url) => url.fmt(f),
            Self::Ssh(url) => url.fmt(f),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Https(String);

impl std::str::FromStr for Https {
    type Err = url::ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(CrateUrl::from_str(s)?.to_string()))
    }
}

impl std::fmt::Display for Https {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
/// SSH ::= [ssh://]<user>@<host>:[port]</path/to/repo> or {user}@<host>:<path/to/repo>
pub struct Ssh {
    prefix: Option<String>,
    user: String,
    host: String,
    port: Option<u16>,
    path: String,
}

impl Ssh {
    fn to_https(&self) -> Https {
        let text = format!("https://{}/{}", self.host, self.path.trim_start_matches('/'));
        // fall back to the raw text when the host is not a valid url host
        match CrateUrl::from_str(&text) {
            Ok(url) => Https(url.to_string()),
            Err(_) => Https(text),
        }
    }
}

impl std::str::FromStr for Ssh {
    type Err = SshError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // check if the string begins with ssh://
        let (prefix, url) = if let Some((base, url)) = s.split_once("://") {
            match base.eq_ignore_ascii_case("ssh") {
                true => (Some(base.to_owned()), url),
                false => return Err(Self::Err::BadBase(base.to_owned())),
            }
        } else {
            (None, s)
        };
        // parse user component
        let (user, url) = match url.split_once('@') {
            Some((user, url)) => (user.to_owned(), url),
            None => return Err(Self::Err::MissingHost),
        };
        // parse host component
        let (host, url) = match url.split_once(':') {
            Some((host, url)) => (host.to_owned(), url),
            None => match prefix.is_some() {
                true => return Err(Self::Err::MissingPort),
                false => return Err(Self::Err::MissingPath),
            },
        };
        // parse port component
        let (port, url) = match prefix.is_some() {
            true => match url.split_once('/') {
                Some((port, path)) => (
                    Some(match port.parse() {
                        Ok(r) => r,
                        Err(e) => return Err(Self::Err::BadPort(port.to_owned(), e)),
                    }),
                    path,
                ),
                None => return Err(Self::Err::MissingPort),
            },
            false => (None, url),
        };
        if url.is_empty() == true {
            return Err(Self::Err::MissingPath);
        }

        Ok(Self {
            prefix: prefix,
            user: user,
            host: host,
            port: port,
            path: url.to_owned(),
        })
    }
}

impl std::fmt::Display for Ssh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(base) = &self.prefix {
            write!(f, "{}://", base)?;
        }
        write!(f, "{}@{}:", self.user, self.host)?;
        if let Some(port) = &self.port {
            write!(f, "{}/", port)?;
        }
        write!(f, "{}", self.path)
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum SshError {
    #[error("invalid ssh base '{0}'")]
    BadBase(String),
    #[error("missing '@' symbol to define host")]
    MissingHost,
    #[error("missing ':' symbol proceeding host")]
    MissingPort,
    #[error("missing path")]
    MissingPath,
    #[error("invalid port number '{0}' due to {1}")]
    BadPort(String, ParseIntError),
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ssh_from_str() {
        // positive case
        assert_eq!(
            Ssh::from_str("ssh://git@github.ks-tech.org:22/rary/gates.git").is_ok(),
            true
        );
        // missing port number
        assert_eq!(
            Ssh::from_str("ssh://git@github.ks-tech.org:/rary/gates.git").is_err(),
            true
        );
        // positive case without base
        assert_eq!(
            Ssh::from_str("git@github.com:hdl-util/hdmi.git").is_ok(),
            true
        );
        // a local path is not an ssh location
        assert_eq!(
            Ssh::from_str("/srv/repos/hdmi.git"),
            Err(SshError::MissingHost)
        );
    }

    #[test]
    fn ssh_to_str() {
        assert_eq!(
            Ssh::from_str("git@github.com:hdl-util/hdmi.git")
                .unwrap()
                .to_string(),
            String::from("git@github.com:hdl-util/hdmi.git")
        );
        assert_eq!(
            Ssh::from_str("ssh://git@github.ks-tech.org:22/rary/gates.git")
                .unwrap()
                .to_string(),
            String::from("ssh://git@github.ks-tech.org:22/rary/gates.git")
        );
    }

    #[test]
    fn ssh_to_https() {
        let url = Ssh::from_str("git@github.com:hdl-util/hdmi.git").unwrap();
        assert_eq!(
            url.to_https(),
            Https::from_str("https://github.com/hdl-util/hdmi.git").unwrap()
        )
    }

    #[test]
    fn canonical_forms_agree() {
        let a = Url::from_str("git@github.com:hdl-util/hdmi.git").unwrap();
        let b = Url::from_str("https://GitHub.com/hdl-util/hdmi").unwrap();
        let c = Url::from_str("http://github.com/hdl-util/hdmi.git/").unwrap();
        let d = Url::from_str("ssh://git@github.com:22/hdl-util/hdmi.git").unwrap();
        assert_eq!(a.canonical(), "github.com/hdl-util/hdmi");
        assert_eq!(b.canonical(), a.canonical());
        assert_eq!(c.canonical(), a.canonical());
        assert_eq!(d.canonical(), a.canonical());
    }

    #[test]
    fn canonical_keeps_explicit_port() {
        let url = Url::from_str("https://git.lab.edu:8443/fpga/sdram.git").unwrap();
        assert_eq!(url.canonical(), "git.lab.edu:8443/fpga/sdram");
    }

    #[test]
    fn trims_repo_path() {
        assert_eq!(trim_repo_path("/hdl-util/hdmi.git"), "hdl-util/hdmi");
        assert_eq!(trim_repo_path("hdl-util/hdmi/"), "hdl-util/hdmi");
        assert_eq!(trim_repo_path("/srv/repos/sound.git/"), "srv/repos/sound");
    }
}
