//! Session credential contracts and the built-in in-memory provider.

// self
use crate::_prelude::*;

/// Boxed future returned by [`CredentialProvider::current_credential`].
pub type CredentialFuture<'a> = Pin<Box<dyn Future<Output = Option<BearerToken>> + 'a + Send>>;

/// Supplies the bearer credential attached to outbound requests.
///
/// Returning `None` signals that no session is active; the client surfaces that as
/// [`Error::NoSession`](crate::error::Error::NoSession) without touching the network.
/// The trait is async because real providers typically read a token cache or refresh
/// a session out of process.
pub trait CredentialProvider
where
	Self: Send + Sync,
{
	/// Resolves the current bearer credential, if a session is active.
	fn current_credential(&self) -> CredentialFuture<'_>;
}

/// Redacted bearer token wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken(String);
impl BearerToken {
	/// Wraps a new bearer token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for BearerToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for BearerToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("BearerToken").field(&"<redacted>").finish()
	}
}
impl Display for BearerToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Thread-safe in-memory session holder for local development and tests.
#[derive(Debug, Default)]
pub struct MemorySession(RwLock<Option<BearerToken>>);
impl MemorySession {
	/// Creates a session already holding `token`.
	pub fn with_token(token: impl Into<String>) -> Self {
		Self(RwLock::new(Some(BearerToken::new(token))))
	}

	/// Installs or replaces the active token.
	pub fn sign_in(&self, token: impl Into<String>) {
		*self.0.write() = Some(BearerToken::new(token));
	}

	/// Clears the active token so subsequent lookups report no session.
	pub fn sign_out(&self) {
		*self.0.write() = None;
	}
}
impl CredentialProvider for MemorySession {
	fn current_credential(&self) -> CredentialFuture<'_> {
		let token = self.0.read().clone();

		Box::pin(async move { token })
	}
}
