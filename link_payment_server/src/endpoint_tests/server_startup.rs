use lpg_common::Secret;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

use super::helpers::prepare_test_db;
use crate::{config::ServerConfig, integrations::LinkProcessor, server::create_server_instance};

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("No free port");
    listener.local_addr().unwrap().port()
}

#[actix_web::test]
async fn server_listens_on_configured_address() {
    let test_db = prepare_test_db().await;
    let config = ServerConfig::new("127.0.0.1", free_port());
    let addr = format!("{}:{}", config.host, config.port);
    let processor = LinkProcessor::new(config.link_api_config(), Secret::new("whsec_test".into())).unwrap();
    let srv = create_server_instance(config, test_db.db.clone(), processor).expect("Server did not bind");
    let handle = srv.handle();
    actix_web::rt::spawn(srv);

    let mut stream = TcpStream::connect(&addr).await.expect("Server is not listening");
    stream.write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.to_lowercase().contains("access-control-allow-origin: *"), "{response}");
    handle.stop(true).await;
}
