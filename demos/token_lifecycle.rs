//! Shows the token lifecycle against a local mock of the token endpoints.
//!
//! The first token expires almost immediately, so the background manager refreshes it while the
//! demo keeps reading the current token and issuing an authenticated request.

// std
use std::time::Duration as StdDuration;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use bank_account_data::{
	auth::Credentials,
	client::{Client, ClientConfig},
	http::ApiEndpoint,
	manager::RenewalPolicy,
	reqwest::{Client as ReqwestClient, Method, StatusCode},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let issue = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v2/token/new/");
			then.status(200).header("content-type", "application/json").body(
				"{\"access\":\"demo-access\",\"access_expires\":2,\"refresh\":\"demo-refresh\",\"refresh_expires\":3600}",
			);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v2/token/refresh/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"demo-access-renewed\",\"access_expires\":86400}");
		})
		.await;
	let _institutions = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v2/institutions/")
				.header("authorization", "Bearer demo-access-renewed");
			then.status(200).body("[{\"id\":\"SANDBOXFINANCE_SFIN0000\"}]");
		})
		.await;
	// The mock server uses a self-signed certificate.
	let http = ReqwestClient::builder().danger_accept_invalid_certs(true).build()?;
	let config = ClientConfig::default()
		.with_endpoint(ApiEndpoint::new(Url::parse(&server.url("/api/v2"))?)?)
		.with_timeout(StdDuration::from_secs(5))
		.with_renewal(RenewalPolicy::default().with_margin(time::Duration::seconds(1)));
	let client =
		Client::with_http_client(Credentials::new("demo-id", "demo-key"), config, http).await?;
	let token = client.token()?;

	println!("Issued {:?}, access expires at {}.", token, token.access_expires_at);

	tokio::time::sleep(StdDuration::from_secs(2)).await;

	let token = client.token()?;

	println!("Renewed access token expires at {}.", token.access_expires_at);

	let request = client.request(Method::GET, "institutions/")?;
	let response = Client::expect(client.send(request).await?, StatusCode::OK).await?;

	println!("Institutions: {}.", response.text().await?);

	issue.assert_async().await;
	refresh.assert_async().await;

	client.shutdown();
	client.manager().wait().await?;

	println!("Manager state after shutdown: {:?}.", client.state());

	Ok(())
}
