//! JWT signing and verification with configurable algorithms.
//!
//! Decoding is the only trust boundary of the crate: claims are handed out
//! only after the header algorithm, the signature, and the time claims have
//! all been checked, in that order.

use std::collections::HashSet;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;

use tokenward_core::config::JwtConfig;
use tokenward_core::{AuthError, AuthResult, ErrorKind, TokenType};

use super::claims::ClaimSet;

/// Key family an algorithm belongs to. All allowed algorithms must share
/// the family of the signing algorithm because one key verifies them all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Hmac,
    Rsa,
    Ec,
    Ed,
}

fn family(algorithm: Algorithm) -> KeyFamily {
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => KeyFamily::Hmac,
        Algorithm::ES256 | Algorithm::ES384 => KeyFamily::Ec,
        Algorithm::EdDSA => KeyFamily::Ed,
        _ => KeyFamily::Rsa,
    }
}

fn parse_algorithm(name: &str) -> AuthResult<Algorithm> {
    Algorithm::from_str(name)
        .map_err(|_| AuthError::configuration(format!("Unsupported algorithm '{name}'")))
}

/// Signs claim sets and verifies compact JWT strings.
#[derive(Clone)]
pub struct JwtCodec {
    /// Header used for every new token.
    header: Header,
    /// Key used for signing.
    encoding_key: EncodingKey,
    /// Key used for verification.
    decoding_key: DecodingKey,
    /// Algorithms accepted in the token header.
    allowed: Vec<Algorithm>,
    /// Signature and claim validation settings.
    validation: Validation,
    /// Clock skew tolerance for `exp`.
    leeway_seconds: i64,
    /// `iss` claim stamped on new tokens.
    issuer: Option<String>,
    /// `aud` claim stamped on new tokens.
    audience: Option<String>,
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("algorithm", &self.header.alg)
            .field("allowed", &self.allowed)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl JwtCodec {
    /// Creates a codec from the signing configuration.
    ///
    /// Fails with `Configuration` if the algorithms are unknown, mix key
    /// families, or the key material for the algorithm is missing or invalid.
    pub fn new(config: &JwtConfig) -> AuthResult<Self> {
        config.validate()?;

        let algorithm = parse_algorithm(&config.algorithm)?;
        let allowed = config
            .effective_allowed_algorithms()
            .iter()
            .map(|name| parse_algorithm(name))
            .collect::<AuthResult<Vec<_>>>()?;

        if let Some(other) = allowed.iter().find(|a| family(**a) != family(algorithm)) {
            return Err(AuthError::configuration(format!(
                "Allowed algorithm {other:?} cannot be verified with a {algorithm:?} key"
            )));
        }

        let (encoding_key, decoding_key) = build_keys(config, algorithm)?;

        let mut validation = Validation::new(algorithm);
        validation.algorithms = allowed.clone();
        // Time claims are checked by hand against the caller's clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = config.leeway_seconds;
        validation.required_spec_claims = HashSet::new();
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            header: Header::new(algorithm),
            encoding_key,
            decoding_key,
            allowed,
            validation,
            leeway_seconds: config.leeway_seconds as i64,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        })
    }

    /// The algorithm new tokens are signed with.
    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    /// The configured issuer, stamped into new claim sets.
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// The configured audience, stamped into new claim sets.
    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    /// Signs a claim set into a compact JWT string.
    pub fn encode(&self, claims: &ClaimSet) -> AuthResult<String> {
        encode(&self.header, claims, &self.encoding_key).map_err(|e| {
            AuthError::with_source(ErrorKind::Encode, format!("Failed to encode token: {e}"), e)
        })
    }

    /// Verifies a token against the current time and returns its claims.
    pub fn decode(&self, token: &str) -> AuthResult<ClaimSet> {
        self.decode_at(token, Utc::now())
    }

    /// Verifies a token as of `now` and returns its claims.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<ClaimSet> {
        let alg = header_algorithm(token)?;
        match Algorithm::from_str(&alg) {
            Ok(algorithm) if self.allowed.contains(&algorithm) => {}
            _ => return Err(AuthError::algorithm(alg)),
        }

        let claims = decode::<ClaimSet>(token, &self.decoding_key, &self.validation)
            .map_err(map_jwt_error)?
            .claims;

        let now = now.timestamp();
        if let Some(exp) = claims.exp {
            if now >= exp.saturating_add(self.leeway_seconds) {
                return Err(AuthError::expired());
            }
        }
        if claims.nbf > now.saturating_add(self.leeway_seconds) {
            return Err(AuthError::decode("Token is not valid yet"));
        }

        check_structure(&claims)?;
        Ok(claims)
    }
}

/// Verifies `token` with an HMAC secret, outside of any configuration file.
pub fn decode_with(
    token: &str,
    secret: &str,
    algorithm: &str,
    allowed_algorithms: &[&str],
) -> AuthResult<ClaimSet> {
    let mut config = JwtConfig::with_secret(secret);
    config.algorithm = algorithm.to_string();
    config.allowed_algorithms = allowed_algorithms.iter().map(|a| a.to_string()).collect();
    JwtCodec::new(&config)?.decode(token)
}

/// Signs `claims` with an HMAC secret, outside of any configuration file.
pub fn encode_with(claims: &ClaimSet, secret: &str, algorithm: &str) -> AuthResult<String> {
    let mut config = JwtConfig::with_secret(secret);
    config.algorithm = algorithm.to_string();
    JwtCodec::new(&config)?.encode(claims)
}

/// The only header field read before the signature is checked.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Reads the raw `alg` name so unknown names and `none` can be rejected as
/// algorithm errors rather than malformed headers.
fn header_algorithm(token: &str) -> AuthResult<String> {
    let segment = token
        .split('.')
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| AuthError::decode("Invalid token header"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::with_source(ErrorKind::Decode, "Invalid token header", e))?;
    let header: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::with_source(ErrorKind::Decode, "Invalid token header", e))?;
    Ok(header.alg)
}

fn build_keys(config: &JwtConfig, algorithm: Algorithm) -> AuthResult<(EncodingKey, DecodingKey)> {
    let key_family = family(algorithm);
    if key_family == KeyFamily::Hmac {
        let secret = config.secret_key.as_bytes();
        return Ok((EncodingKey::from_secret(secret), DecodingKey::from_secret(secret)));
    }

    let (Some(private_pem), Some(public_pem)) = (&config.private_key_pem, &config.public_key_pem)
    else {
        return Err(AuthError::configuration(format!(
            "PEM keys are required for {algorithm:?}"
        )));
    };
    let (private_pem, public_pem) = (private_pem.as_bytes(), public_pem.as_bytes());

    let keys = match key_family {
        KeyFamily::Hmac | KeyFamily::Rsa => EncodingKey::from_rsa_pem(private_pem)
            .and_then(|enc| DecodingKey::from_rsa_pem(public_pem).map(|dec| (enc, dec))),
        KeyFamily::Ec => EncodingKey::from_ec_pem(private_pem)
            .and_then(|enc| DecodingKey::from_ec_pem(public_pem).map(|dec| (enc, dec))),
        KeyFamily::Ed => EncodingKey::from_ed_pem(private_pem)
            .and_then(|enc| DecodingKey::from_ed_pem(public_pem).map(|dec| (enc, dec))),
    };

    keys.map_err(|e| {
        AuthError::with_source(
            ErrorKind::Configuration,
            format!("Invalid {algorithm:?} key material: {e}"),
            e,
        )
    })
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    let (kind, message) = match err.kind() {
        JwtErrorKind::InvalidSignature => (ErrorKind::Signature, "Signature verification failed".to_string()),
        JwtErrorKind::ExpiredSignature => (ErrorKind::Expired, "Token has expired".to_string()),
        JwtErrorKind::InvalidAlgorithm | JwtErrorKind::InvalidAlgorithmName | JwtErrorKind::MissingAlgorithm => {
            (ErrorKind::Algorithm, format!("Algorithm rejected: {err}"))
        }
        JwtErrorKind::InvalidIssuer | JwtErrorKind::InvalidAudience | JwtErrorKind::MissingRequiredClaim(_) => {
            (ErrorKind::Decode, format!("Invalid claims: {err}"))
        }
        _ => (ErrorKind::Decode, format!("Invalid token: {err}")),
    };
    AuthError::with_source(kind, message, err)
}

/// Required-claim rules the type system cannot express.
fn check_structure(claims: &ClaimSet) -> AuthResult<()> {
    if claims.jti.is_empty() {
        return Err(AuthError::decode("Missing or invalid claim: jti"));
    }
    if claims.exp.is_some_and(|exp| exp < claims.iat) {
        return Err(AuthError::decode("Invalid claims: exp precedes iat"));
    }
    match (claims.token_type, claims.fresh) {
        (TokenType::Access, None) => Err(AuthError::decode("Missing claim: fresh")),
        (TokenType::Refresh, Some(_)) => {
            Err(AuthError::decode("Refresh tokens cannot carry a fresh claim"))
        }
        _ => Ok(()),
    }
}
