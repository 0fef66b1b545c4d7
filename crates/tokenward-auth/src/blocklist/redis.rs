//! Redis-backed blocklist shared between processes, using a Lua script so an
//! entry and its identity index are written together.
//!
//! Suitable for multi-node deployments.

#[cfg(feature = "redis-blocklist")]
mod implementation {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::Utc;
    use redis::Commands;
    use serde_json::Value;
    use tracing::{debug, info, warn};

    use tokenward_core::{AuthError, AuthResult, BoxError, ErrorKind, RevocationLookup, RevocationQuery};

    use crate::blocklist::entry::RevokedToken;
    use crate::jwt::ClaimSet;

    /// Key prefix for revocation records, one per `jti`.
    const ENTRY_PREFIX: &str = "jwt:blocklist:jti:";
    /// Key prefix for the per-identity set of revoked `jti` values.
    const IDENTITY_PREFIX: &str = "jwt:blocklist:identity:";

    /// Shortest TTL given to a blocklist entry of an expiring token.
    const MIN_ENTRY_TTL_SECONDS: u64 = 60;

    /// Idle connections kept for reuse.
    const MAX_IDLE_CONNECTIONS: usize = 8;

    /// Lua script storing a revocation record and indexing it by identity.
    ///
    /// KEYS[1] = entry key
    /// KEYS[2] = identity set
    /// ARGV[1] = serialized record
    /// ARGV[2] = jti
    /// ARGV[3] = TTL in seconds, or -1 for a non-expiring token
    ///
    /// The identity set lives as long as its longest-lived entry.
    const REVOKE_SCRIPT: &str = r#"
        local entry_key = KEYS[1]
        local identity_key = KEYS[2]
        local ttl = tonumber(ARGV[3])

        local existed = redis.call('EXISTS', identity_key)
        redis.call('SADD', identity_key, ARGV[2])

        if ttl < 0 then
            redis.call('SET', entry_key, ARGV[1])
            redis.call('PERSIST', identity_key)
        else
            redis.call('SET', entry_key, ARGV[1], 'EX', ttl)
            local current = redis.call('TTL', identity_key)
            if existed == 0 or (current >= 0 and current < ttl) then
                redis.call('EXPIRE', identity_key, ttl)
            end
        end

        return 1
    "#;

    /// Blocklist stored in Redis under `jwt:blocklist:jti:<jti>`.
    ///
    /// Entries of expiring tokens carry a TTL equal to the token's remaining
    /// lifetime, so Redis prunes them once the token would be rejected as
    /// expired anyway. Identity sets may briefly list `jti` values whose
    /// entry is gone; those are dropped when the set is read.
    ///
    /// Each command runs on its own connection, taken from a small idle pool
    /// or opened on demand, so lookups from different threads do not queue
    /// behind one socket.
    pub struct RedisBlocklist {
        /// Redis client used to open connections.
        client: redis::Client,
        /// Connections returned after a successful command.
        idle: Mutex<Vec<redis::Connection>>,
        /// Connect timeout.
        connect_timeout: Duration,
        /// Read and write timeout of every connection.
        io_timeout: Duration,
    }

    impl std::fmt::Debug for RedisBlocklist {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let idle = self.idle.lock().map(|idle| idle.len()).unwrap_or_default();
            f.debug_struct("RedisBlocklist")
                .field("idle_connections", &idle)
                .field("connect_timeout", &self.connect_timeout)
                .field("io_timeout", &self.io_timeout)
                .finish()
        }
    }

    impl RedisBlocklist {
        /// Creates a blocklist for the given Redis URL. Does not connect yet.
        pub fn open(url: &str) -> AuthResult<Self> {
            let client = redis::Client::open(url).map_err(|e| {
                AuthError::with_source(ErrorKind::Configuration, format!("Invalid Redis URL: {e}"), e)
            })?;
            Ok(Self {
                client,
                idle: Mutex::new(Vec::new()),
                connect_timeout: Duration::from_secs(2),
                io_timeout: Duration::from_secs(2),
            })
        }

        /// Overrides the connect timeout.
        pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
            self.connect_timeout = timeout;
            self
        }

        /// Overrides the read/write timeout.
        pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
            self.io_timeout = timeout;
            self
        }

        /// Returns the Redis key for a `jti`.
        pub fn key_for(jti: &str) -> String {
            format!("{ENTRY_PREFIX}{jti}")
        }

        /// Returns the Redis key of the revoked-`jti` set for an identity.
        pub fn identity_key_for(identity: &Value) -> String {
            format!("{IDENTITY_PREFIX}{identity}")
        }

        /// TTL for the blocklist entry of a token expiring at `exp`.
        ///
        /// Non-expiring tokens get no TTL. Expiring tokens keep their entry for
        /// at least [`MIN_ENTRY_TTL_SECONDS`] so a token revoked moments before
        /// its expiry is still rejected within the verifier's leeway.
        pub fn entry_ttl(exp: Option<i64>, now: i64) -> Option<u64> {
            exp.map(|exp| {
                let remaining = exp.saturating_sub(now).max(0) as u64;
                remaining.max(MIN_ENTRY_TTL_SECONDS)
            })
        }

        /// Revokes the token described by a verified claim set.
        pub fn revoke(&self, claims: &ClaimSet) -> AuthResult<()> {
            self.insert(&RevokedToken::from_claims(claims, Utc::now()))
        }

        /// Stores a revocation record, replacing any record for the same `jti`.
        pub fn insert(&self, entry: &RevokedToken) -> AuthResult<()> {
            let payload = serde_json::to_string(entry)?;
            let ttl = Self::entry_ttl(entry.expires_at, Utc::now().timestamp())
                .map_or(-1, |ttl| i64::try_from(ttl).unwrap_or(i64::MAX));

            let script = redis::Script::new(REVOKE_SCRIPT);
            self.run(|conn| {
                script
                    .key(Self::key_for(&entry.jti))
                    .key(Self::identity_key_for(&entry.identity))
                    .arg(&payload)
                    .arg(&entry.jti)
                    .arg(ttl)
                    .invoke::<i64>(conn)
            })
            .map_err(|e| AuthError::with_boxed_source(ErrorKind::RevocationCheck, "Failed to blocklist token", e))?;

            info!(jti = %entry.jti, token_type = %entry.token_type, "Token revoked");
            Ok(())
        }

        /// Lifts a revocation. Returns `false` if the `jti` was not revoked.
        pub fn unrevoke(&self, jti: &str) -> AuthResult<bool> {
            let Some(entry) = self.get(jti)? else {
                return Ok(false);
            };

            let removed: (u64, u64) = self
                .run(|conn| {
                    redis::pipe()
                        .atomic()
                        .del(Self::key_for(jti))
                        .srem(Self::identity_key_for(&entry.identity), jti)
                        .query(conn)
                })
                .map_err(|e| AuthError::with_boxed_source(ErrorKind::RevocationCheck, "Failed to unrevoke token", e))?;

            let lifted = removed.0 > 0;
            if lifted {
                info!(jti = %jti, "Token revocation lifted");
            }
            Ok(lifted)
        }

        /// The revocation record for a `jti`, if any.
        pub fn get(&self, jti: &str) -> AuthResult<Option<RevokedToken>> {
            let raw: Option<String> = self
                .run(|conn| conn.get(Self::key_for(jti)))
                .map_err(|e| AuthError::with_boxed_source(ErrorKind::RevocationCheck, "Failed to read blocklist", e))?;
            raw.map(|raw| serde_json::from_str(&raw).map_err(AuthError::from))
                .transpose()
        }

        /// Revoked tokens of one identity, oldest revocation first.
        pub fn entries_for(&self, identity: &Value) -> AuthResult<Vec<RevokedToken>> {
            let identity_key = Self::identity_key_for(identity);
            let jtis: Vec<String> = self
                .run(|conn| conn.smembers(&identity_key))
                .map_err(|e| AuthError::with_boxed_source(ErrorKind::RevocationCheck, "Failed to read blocklist", e))?;

            let (entries, stale) = self.load(&jtis)?;
            if !stale.is_empty() {
                debug!(identity = %identity, stale = stale.len(), "Dropping lapsed blocklist index members");
                self.run(|conn| conn.srem::<_, _, u64>(&identity_key, &stale))
                    .map_err(|e| AuthError::with_boxed_source(ErrorKind::RevocationCheck, "Failed to prune blocklist", e))?;
            }
            Ok(entries)
        }

        /// Every revoked token, oldest revocation first.
        pub fn entries(&self) -> AuthResult<Vec<RevokedToken>> {
            let pattern = format!("{ENTRY_PREFIX}*");
            let keys: Vec<String> = self
                .run(|conn| {
                    let mut keys = Vec::new();
                    let mut cursor: u64 = 0;
                    loop {
                        let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                            .arg(cursor)
                            .arg("MATCH")
                            .arg(&pattern)
                            .arg("COUNT")
                            .arg(100)
                            .query(conn)?;
                        keys.extend(batch);
                        if next == 0 {
                            break Ok(keys);
                        }
                        cursor = next;
                    }
                })
                .map_err(|e| AuthError::with_boxed_source(ErrorKind::RevocationCheck, "Failed to scan blocklist", e))?;

            let jtis: Vec<String> = keys
                .iter()
                .filter_map(|key| key.strip_prefix(ENTRY_PREFIX).map(str::to_string))
                .collect();
            Ok(self.load(&jtis)?.0)
        }

        /// Fetches the records for `jtis`. Returns the records found, sorted,
        /// and the `jti` values whose record no longer exists.
        fn load(&self, jtis: &[String]) -> AuthResult<(Vec<RevokedToken>, Vec<String>)> {
            if jtis.is_empty() {
                return Ok((Vec::new(), Vec::new()));
            }

            let keys: Vec<String> = jtis.iter().map(|jti| Self::key_for(jti)).collect();
            let raw: Vec<Option<String>> = self
                .run(|conn| redis::cmd("MGET").arg(&keys).query(conn))
                .map_err(|e| AuthError::with_boxed_source(ErrorKind::RevocationCheck, "Failed to read blocklist", e))?;

            let mut entries = Vec::with_capacity(raw.len());
            let mut stale = Vec::new();
            for (jti, raw) in jtis.iter().zip(raw) {
                match raw {
                    Some(raw) => entries.push(serde_json::from_str::<RevokedToken>(&raw)?),
                    None => stale.push(jti.clone()),
                }
            }
            entries.sort_by(|a, b| a.revoked_at.cmp(&b.revoked_at).then_with(|| a.jti.cmp(&b.jti)));
            Ok((entries, stale))
        }

        /// Runs `op` on a pooled or freshly opened connection.
        ///
        /// The connection is returned to the pool only if `op` succeeds.
        fn run<T>(&self, op: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<T>) -> Result<T, BoxError> {
            let mut connection = match self.checkout()? {
                Some(connection) => connection,
                None => self.connect()?,
            };

            match op(&mut connection) {
                Ok(value) => {
                    self.checkin(connection);
                    Ok(value)
                }
                Err(e) => {
                    warn!(error = %e, "Redis command failed, dropping connection");
                    Err(Box::new(e))
                }
            }
        }

        fn connect(&self) -> Result<redis::Connection, BoxError> {
            let connection = self.client.get_connection_with_timeout(self.connect_timeout)?;
            connection.set_read_timeout(Some(self.io_timeout))?;
            connection.set_write_timeout(Some(self.io_timeout))?;
            Ok(connection)
        }

        fn checkout(&self) -> Result<Option<redis::Connection>, BoxError> {
            let mut idle = self
                .idle
                .lock()
                .map_err(|_| BoxError::from("Redis connection pool lock poisoned"))?;
            Ok(idle.pop())
        }

        fn checkin(&self, connection: redis::Connection) {
            if let Ok(mut idle) = self.idle.lock() {
                if idle.len() < MAX_IDLE_CONNECTIONS {
                    idle.push(connection);
                }
            }
        }
    }

    impl RevocationLookup for RedisBlocklist {
        fn is_revoked(&self, query: &RevocationQuery<'_>) -> Result<bool, BoxError> {
            let key = Self::key_for(query.jti);
            self.run(|conn| conn.exists(&key))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;
        use tokenward_core::TokenType;

        fn unreachable() -> RedisBlocklist {
            RedisBlocklist::open("redis://127.0.0.1:1/")
                .expect("client")
                .with_connect_timeout(Duration::from_millis(200))
        }

        #[test]
        fn test_key_format() {
            assert_eq!(RedisBlocklist::key_for("abc"), "jwt:blocklist:jti:abc");
            assert_eq!(
                RedisBlocklist::identity_key_for(&json!("user-1")),
                r#"jwt:blocklist:identity:"user-1""#
            );
            assert_eq!(
                RedisBlocklist::identity_key_for(&json!({"id": 7})),
                r#"jwt:blocklist:identity:{"id":7}"#
            );
        }

        #[test]
        fn test_entry_ttl() {
            assert_eq!(RedisBlocklist::entry_ttl(None, 100), None);
            assert_eq!(RedisBlocklist::entry_ttl(Some(1_100), 100), Some(1_000));
            assert_eq!(RedisBlocklist::entry_ttl(Some(110), 100), Some(60));
            assert_eq!(RedisBlocklist::entry_ttl(Some(50), 100), Some(60));
        }

        #[test]
        fn test_invalid_url_is_configuration_error() {
            let err = RedisBlocklist::open("not a url").expect_err("invalid url");
            assert_eq!(err.kind, ErrorKind::Configuration);
        }

        #[test]
        fn test_debug_does_not_require_connection() {
            let rendered = format!("{:?}", unreachable());
            assert!(rendered.contains("RedisBlocklist"));
            assert!(rendered.contains("idle_connections: 0"));
        }

        #[test]
        fn test_unreachable_server_is_lookup_error() {
            let blocklist = unreachable();
            let identity = json!("user-1");
            let query = RevocationQuery {
                jti: "abc",
                token_type: TokenType::Access,
                identity: &identity,
            };
            assert!(blocklist.is_revoked(&query).is_err());
        }

        #[test]
        fn test_unreachable_server_fails_inspection() {
            let blocklist = unreachable();
            assert_eq!(
                blocklist.get("abc").expect_err("get").kind,
                ErrorKind::RevocationCheck
            );
            assert_eq!(
                blocklist.entries_for(&json!("user-1")).expect_err("entries").kind,
                ErrorKind::RevocationCheck
            );
        }
    }
}

#[cfg(feature = "redis-blocklist")]
pub use implementation::RedisBlocklist;
