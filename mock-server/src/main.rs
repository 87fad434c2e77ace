use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").ok();
    let addr = mock_server::listen_addr(port.as_deref());
    let listener = TcpListener::bind(&addr).await?;

    println!("bookdesk mock services on http://{}", listener.local_addr()?);
    for (method, path) in mock_server::ROUTES {
        println!("  {method:<4} {path}");
    }
    mock_server::run(listener).await
}
