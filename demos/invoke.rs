use serde::Deserialize;
use webclient_executor::{ClientOptions, RequestExecutor, RequestSpec};

#[derive(Debug, Deserialize)]
struct Ip {
    origin: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let base = std::env::var("WEBCLIENT_DEMO_URL")
        .unwrap_or_else(|_| "https://httpbin.org".to_owned());
    let options = ClientOptions::from_env().map_err(anyhow::Error::msg)?;
    let executor = RequestExecutor::reqwest()?.with_options(options);

    let ip: Ip = executor
        .execute(RequestSpec::get(format!("{base}/ip")).build()?)
        .json::<Ip>()
        .await?;
    println!("origin: {}", ip.origin);

    let echoed = executor
        .execute_async(
            RequestSpec::post(format!("{base}/post"))
                .header("x-demo", "invoke")
                .json(&serde_json::json!({ "name": "Kit" }))
                .build()?,
        )
        .await?;
    println!("{echoed}");

    Ok(())
}
