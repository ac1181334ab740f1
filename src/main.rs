use crud_loader::app::LoaderApp;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoaderApp::run().await
}
