pub mod api;

use crate::cli::Args;
use self::api::AppState;
use std::error::Error;
use std::net::SocketAddr;

pub struct Server {
    addr: SocketAddr,
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(addr: SocketAddr, state: AppState, args: Args) -> Self {
        Self { addr, state, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let app = api::router(self.state.clone(), &self.args.static_dir);
        api::start_http_server(self.addr, app, &self.args).await
    }
}
