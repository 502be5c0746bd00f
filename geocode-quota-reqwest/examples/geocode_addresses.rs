//! Geocodes a handful of addresses and prints the results as JSON
//!
//! State is kept in `./.geocoder-data`; the API key is asked for on the
//! first run.
//!
//! Run with: RUST_LOG=info cargo run --example geocode_addresses

use geocode_quota_reqwest::{
    FileStateStore, GeocodeResponse, PromptCredential, ReqwestGeocoder,
    ReqwestTransport,
};

const ADDRESSES: [&str; 5] = [
    "704 S 2nd St, Minneapolis, MN 55401",
    "200, Tower Ave, St Paul, MN 55111",
    "240 Summit Ave, St Paul, MN 55102",
    "239 Selby Ave, St Paul, MN 55102",
    "75 Rev Dr Martin Luther King Jr Boulevard., St Paul, MN 55155",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let client = ReqwestGeocoder::builder(
        ReqwestTransport::default(),
        FileStateStore::default(),
    )
    .credential_provider(PromptCredential::stdio())
    .build()
    .await?;

    let mut responses = Vec::with_capacity(ADDRESSES.len());
    for address in ADDRESSES {
        match client.get_results(address).await {
            Ok(response) => responses.push(response),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                println!("{e}");
                responses.push(GeocodeResponse::default());
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&responses)?);
    Ok(())
}
