use crate::config::Config;
use crate::service::Explorer;

pub struct AppState {
    pub config: Config,
    pub explorer: Explorer,
}
