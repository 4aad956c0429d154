pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Config(#[from] sift_config::Error),
	#[error("The {driver} driver is not compiled into this build.")]
	DriverUnavailable { driver: String },
	#[error(transparent)]
	Storage(#[from] sift_storage::Error),
	#[error(transparent)]
	Daemon(#[from] sift_daemon::Error),
	#[error("No index mapping is configured for {index:?}.")]
	UnmappedIndex { index: String },
	#[error("Repository {name:?} is not registered.")]
	UnknownRepository { name: String },
	#[error("Model {name:?} is not registered.")]
	UnknownModel { name: String },
	#[error("No storage session is open; set driver to mysql or pgsql to fetch from tables.")]
	NoStorageSession,
	#[error("Fetch failed: {message}")]
	Fetch { message: String },
}
impl Error {
	/// Errors raised while setting the client up: bad database params or a missing driver.
	pub fn is_config(&self) -> bool {
		matches!(self, Self::Config(_) | Self::DriverUnavailable { .. })
	}
}
