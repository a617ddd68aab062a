//! Cluster credentials for talking to the API server.
//!
//! Credentials are loaded once at process start. The in-cluster service
//! account is preferred; a kubeconfig file is the fallback for running the
//! service outside the cluster during development.

use crate::error::AuthzError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the kubelet mounts the pod's service account.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
const SERVICE_PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";

/// How the client authenticates to the API server.
#[derive(Clone, PartialEq, Eq)]
pub enum ClientAuth {
    /// No client credentials.
    None,
    /// `Authorization: Bearer` token.
    BearerToken(String),
    /// Mutual TLS; certificate chain followed by the private key, PEM encoded.
    ClientCertificate(Vec<u8>),
}

impl fmt::Debug for ClientAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::BearerToken(_) => write!(f, "BearerToken(<redacted>)"),
            Self::ClientCertificate(_) => write!(f, "ClientCertificate(<redacted>)"),
        }
    }
}

/// Everything needed to reach and authenticate to the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterCredentials {
    /// API server base URL, e.g. `https://10.96.0.1:443`.
    pub server: String,
    /// PEM bundle to trust in addition to the system roots.
    pub ca_pem: Option<Vec<u8>>,
    /// Skip server certificate verification (kubeconfig opt-in only).
    pub insecure_skip_tls_verify: bool,
    /// Client authentication.
    pub auth: ClientAuth,
}

impl ClusterCredentials {
    /// Loads credentials, preferring the in-cluster service account.
    ///
    /// Falls back to the kubeconfig at `kubeconfig`, else `$KUBECONFIG`,
    /// else `~/.kube/config`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialsUnavailable` naming why both sources failed.
    pub fn load(kubeconfig: Option<&Path>) -> tenant_gate_core::Result<Self, AuthzError> {
        let in_cluster = in_cluster_from(
            std::env::var(SERVICE_HOST_ENV).ok(),
            std::env::var(SERVICE_PORT_ENV).ok(),
            Path::new(SERVICE_ACCOUNT_DIR),
        );
        let kubeconfig = kubeconfig
            .map(Path::to_path_buf)
            .or_else(default_kubeconfig_path);
        Ok(resolve(in_cluster, kubeconfig)?)
    }
}

fn resolve(
    in_cluster: Result<ClusterCredentials, AuthzError>,
    kubeconfig: Option<PathBuf>,
) -> Result<ClusterCredentials, AuthzError> {
    let in_cluster_err = match in_cluster {
        Ok(credentials) => {
            info!(server = %credentials.server, "using in-cluster credentials");
            return Ok(credentials);
        }
        Err(e) => e,
    };
    debug!(error = %in_cluster_err, "in-cluster credentials unavailable");

    let Some(path) = kubeconfig else {
        return Err(AuthzError::CredentialsUnavailable {
            details: format!("in-cluster: {}; kubeconfig: no path found", in_cluster_err),
        });
    };

    match kubeconfig_from(&path) {
        Ok(credentials) => {
            info!(
                server = %credentials.server,
                kubeconfig = %path.display(),
                "using kubeconfig credentials"
            );
            Ok(credentials)
        }
        Err(e) => Err(AuthzError::CredentialsUnavailable {
            details: format!(
                "in-cluster: {}; kubeconfig {}: {}",
                in_cluster_err,
                path.display(),
                e
            ),
        }),
    }
}

fn default_kubeconfig_path() -> Option<PathBuf> {
    if let Some(paths) = std::env::var_os("KUBECONFIG") {
        if let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
            return Some(first);
        }
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".kube").join("config"))
}

fn in_cluster_from(
    host: Option<String>,
    port: Option<String>,
    dir: &Path,
) -> Result<ClusterCredentials, AuthzError> {
    let (Some(host), Some(port)) = (host, port) else {
        return Err(AuthzError::CredentialsUnavailable {
            details: format!(
                "{} and {} must be set",
                SERVICE_HOST_ENV, SERVICE_PORT_ENV
            ),
        });
    };

    let token_path = dir.join("token");
    let token = std::fs::read_to_string(&token_path).map_err(|e| {
        AuthzError::InvalidCredentials {
            details: format!("reading {}: {}", token_path.display(), e),
        }
    })?;
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(AuthzError::InvalidCredentials {
            details: format!("{} is empty", token_path.display()),
        });
    }

    let ca_path = dir.join("ca.crt");
    let ca_pem = read_file(&ca_path)?;

    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host
    };

    Ok(ClusterCredentials {
        server: format!("https://{}:{}", host, port),
        ca_pem: Some(ca_pem),
        insecure_skip_tls_verify: false,
        auth: ClientAuth::BearerToken(token),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    current_context: Option<String>,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    #[serde(default)]
    certificate_authority: Option<PathBuf>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UserEntry {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    token_file: Option<PathBuf>,
    #[serde(default)]
    client_certificate: Option<PathBuf>,
    #[serde(default)]
    client_certificate_data: Option<String>,
    #[serde(default)]
    client_key: Option<PathBuf>,
    #[serde(default)]
    client_key_data: Option<String>,
    #[serde(default)]
    exec: Option<serde_yaml::Value>,
    #[serde(default)]
    auth_provider: Option<serde_yaml::Value>,
}

fn kubeconfig_from(path: &Path) -> Result<ClusterCredentials, AuthzError> {
    let raw = std::fs::read_to_string(path).map_err(|e| AuthzError::CredentialsUnavailable {
        details: format!("reading {}: {}", path.display(), e),
    })?;
    let config: Kubeconfig =
        serde_yaml::from_str(&raw).map_err(|e| AuthzError::InvalidCredentials {
            details: format!("parsing kubeconfig: {}", e),
        })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let context_name = config
        .current_context
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| invalid("kubeconfig has no current-context"))?;
    let context = config
        .contexts
        .iter()
        .find(|c| c.name == context_name)
        .map(|c| &c.context)
        .ok_or_else(|| invalid(format!("context '{}' not found", context_name)))?;
    let cluster = config
        .clusters
        .iter()
        .find(|c| c.name == context.cluster)
        .map(|c| &c.cluster)
        .ok_or_else(|| invalid(format!("cluster '{}' not found", context.cluster)))?;

    let ca_pem = match (&cluster.certificate_authority_data, &cluster.certificate_authority) {
        (Some(data), _) => Some(decode_data("certificate-authority-data", data)?),
        (None, Some(file)) => Some(read_file(&base.join(file))?),
        (None, None) => None,
    };

    let auth = match context.user.as_deref().filter(|name| !name.is_empty()) {
        Some(user_name) => {
            let user = config
                .users
                .iter()
                .find(|u| u.name == user_name)
                .map(|u| &u.user)
                .ok_or_else(|| invalid(format!("user '{}' not found", user_name)))?;
            user_auth(user, base)?
        }
        None => ClientAuth::None,
    };

    Ok(ClusterCredentials {
        server: cluster.server.trim_end_matches('/').to_string(),
        ca_pem,
        insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
        auth,
    })
}

fn user_auth(user: &UserEntry, base: &Path) -> Result<ClientAuth, AuthzError> {
    if let Some(token) = user.token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(ClientAuth::BearerToken(token.to_string()));
    }
    if let Some(file) = &user.token_file {
        let path = base.join(file);
        let token = std::fs::read_to_string(&path).map_err(|e| {
            invalid(format!("reading {}: {}", path.display(), e))
        })?;
        return Ok(ClientAuth::BearerToken(token.trim().to_string()));
    }

    let cert = match (&user.client_certificate_data, &user.client_certificate) {
        (Some(data), _) => Some(decode_data("client-certificate-data", data)?),
        (None, Some(file)) => Some(read_file(&base.join(file))?),
        (None, None) => None,
    };
    let key = match (&user.client_key_data, &user.client_key) {
        (Some(data), _) => Some(decode_data("client-key-data", data)?),
        (None, Some(file)) => Some(read_file(&base.join(file))?),
        (None, None) => None,
    };
    match (cert, key) {
        (Some(mut cert), Some(key)) => {
            if !cert.ends_with(b"\n") {
                cert.push(b'\n');
            }
            cert.extend_from_slice(&key);
            return Ok(ClientAuth::ClientCertificate(cert));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(invalid(
                "client certificate and client key must be given together",
            ));
        }
        (None, None) => {}
    }

    if user.exec.is_some() || user.auth_provider.is_some() {
        return Err(invalid(
            "exec and auth-provider credential plugins are not supported",
        ));
    }
    Ok(ClientAuth::None)
}

fn decode_data(field: &str, data: &str) -> Result<Vec<u8>, AuthzError> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| invalid(format!("decoding {}: {}", field, e)))
}

fn read_file(path: &Path) -> Result<Vec<u8>, AuthzError> {
    std::fs::read(path).map_err(|e| invalid(format!("reading {}: {}", path.display(), e)))
}

fn invalid(details: impl Into<String>) -> AuthzError {
    AuthzError::InvalidCredentials {
        details: details.into(),
    }
}
