use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::permission::{AccessLevel, TransactionGrant};

/// Default access of one screen component before user grants apply.
#[derive(Debug, Clone, Copy)]
pub struct ComponentDefault {
    pub id: &'static str,
    pub level: AccessLevel,
}

/// Declarative permission layout of one screen: its transaction and the
/// components it toggles.
#[derive(Debug)]
pub struct PermissionManifest {
    pub screen: &'static str,
    pub transaction: &'static str,
    pub level: AccessLevel,
    pub components: &'static [ComponentDefault],
}

const fn writable(id: &'static str) -> ComponentDefault {
    ComponentDefault {
        id,
        level: AccessLevel::Write,
    }
}

pub const IMPORT_SCREEN: PermissionManifest = PermissionManifest {
    screen: "importacao",
    transaction: "/backend-imovel/ligacaoEsgotoLote",
    level: AccessLevel::Write,
    components: &[
        writable("nomeArquivoLigacaoEsgoto"),
        writable("btnEnviarArquivo"),
        writable("btnLimparFiltro"),
    ],
};

pub const VALIDATION_SCREEN: PermissionManifest = PermissionManifest {
    screen: "validacao",
    transaction: "/backend-cadastro/lacreLote",
    level: AccessLevel::Write,
    components: &[writable("botaoConfirmar")],
};

pub const ATTACHMENTS_SCREEN: PermissionManifest = PermissionManifest {
    screen: "anexos",
    transaction: "/backend-cadastro/anexos",
    level: AccessLevel::Write,
    components: &[
        writable("nomeArquivoLigacaoEsgoto"),
        writable("btnEnviarArquivo"),
        writable("btnLimparFiltro"),
    ],
};

const MANIFESTS: [&PermissionManifest; 3] = [&IMPORT_SCREEN, &VALIDATION_SCREEN, &ATTACHMENTS_SCREEN];

pub fn manifest_for(screen: &str) -> Option<&'static PermissionManifest> {
    MANIFESTS.into_iter().find(|manifest| manifest.screen == screen)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedComponent {
    pub id: String,
    pub level: AccessLevel,
    /// True unless the component is writable.
    pub disabled: bool,
}

/// Effective permissions of one user on one screen.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPermissions {
    pub screen: String,
    pub transaction: String,
    pub level: AccessLevel,
    pub components: Vec<ResolvedComponent>,
    /// Rule-exception indices active for the user.
    pub exceptions: Vec<u32>,
}

impl ResolvedPermissions {
    pub fn can_write(&self) -> bool {
        self.level == AccessLevel::Write
    }

    pub fn component(&self, id: &str) -> Option<AccessLevel> {
        self.components
            .iter()
            .find(|component| component.id == id)
            .map(|component| component.level)
    }

    pub fn disabled(&self, id: &str) -> bool {
        self.component(id) != Some(AccessLevel::Write)
    }
}

/// Apply a user's grants to a screen manifest.
///
/// Without a grant for the screen's transaction the manifest defaults stand.
/// A read-only or unavailable transaction caps every component at that level;
/// otherwise components named in the grant take the granted level.
pub fn resolve_permissions(
    manifest: &PermissionManifest,
    grants: &[TransactionGrant],
) -> ResolvedPermissions {
    let mut components: Vec<ResolvedComponent> = manifest
        .components
        .iter()
        .map(|component| ResolvedComponent {
            id: component.id.to_string(),
            level: component.level,
            disabled: component.level != AccessLevel::Write,
        })
        .collect();

    let mut level = manifest.level;
    let mut exceptions = Vec::new();

    if let Some(grant) = grants.iter().find(|g| g.transaction == manifest.transaction) {
        level = grant.level;
        exceptions = grant.rules.clone();

        for component in &mut components {
            component.level = match level {
                AccessLevel::Write => grant
                    .components
                    .iter()
                    .find(|granted| granted.component == component.id)
                    .map_or(component.level, |granted| granted.level),
                capped => capped,
            };
            component.disabled = component.level != AccessLevel::Write;
        }
    } else {
        debug!(
            screen = manifest.screen,
            transaction = manifest.transaction,
            "No grant for transaction, using defaults"
        );
    }

    ResolvedPermissions {
        screen: manifest.screen.to_string(),
        transaction: manifest.transaction.to_string(),
        level,
        components,
        exceptions,
    }
}

/// Claims of the bearer token issued by the back-office login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub exp: u64,

    #[serde(rename = "transacoes", default)]
    pub transactions: Vec<TransactionGrant>,
}

/// Yields the authenticated user and their transaction grants for a request.
pub trait CredentialSource: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<UserClaims, AuthError>;
}

/// Verifies HS256 bearer tokens signed with the shared secret.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl CredentialSource for JwtAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<UserClaims, AuthError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingToken)?;

        let data = decode::<UserClaims>(token.trim(), &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}
