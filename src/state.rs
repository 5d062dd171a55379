use std::sync::Arc;

use crate::config::Config;
use crate::hub::Hub;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub hub: Hub,
}
