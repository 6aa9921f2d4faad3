use clap::Parser;
use reqwest::{Client, Method};
use serde_json::{Value, json};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(default_value = "http://localhost:1111")]
    base_url: String,

    #[arg(long, default_value = "0xsmoke")]
    campaign: String,

    #[arg(long, default_value_t = 1)]
    stage: u32,
}

async fn call(
    client: &Client,
    method: Method,
    url: String,
    body: Option<Value>,
) -> Result<Value, reqwest::Error> {
    let mut request = client.request(method.clone(), &url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let json = response.json::<Value>().await.unwrap_or(Value::Null);

    println!("{method} {url} -> {status}");
    println!("{json}\n");

    Ok(json)
}

#[tokio::main]
async fn main() -> Result<(), reqwest::Error> {
    let args = Args::parse();
    let client = Client::new();

    let base = args.base_url.trim_end_matches('/');
    let campaign = &args.campaign;
    let stage = args.stage;

    call(
        &client,
        Method::POST,
        format!("{base}/campaign"),
        Some(json!({ "address": campaign, "name": "Smoke Test", "stages": [] })),
    )
    .await?;

    call(
        &client,
        Method::POST,
        format!("{base}/{campaign}"),
        Some(json!({ "stage": stage, "powText": "smoke test proof" })),
    )
    .await?;

    let investors = [("0xyes1", true), ("0xyes2", true), ("0xno1", false)];

    for (investor, yes) in investors {
        call(
            &client,
            Method::POST,
            format!("{base}/{campaign}/registerInvestor"),
            Some(json!({ "investorAddress": investor, "name": investor })),
        )
        .await?;

        call(
            &client,
            Method::POST,
            format!("{base}/{campaign}/{stage}/vote"),
            Some(json!({ "yes": yes, "investorAddress": investor })),
        )
        .await?;
    }

    call(
        &client,
        Method::PUT,
        format!("{base}/{campaign}/{stage}/vote"),
        Some(json!({ "yes": true, "investorAddress": "0xno1" })),
    )
    .await?;

    call(
        &client,
        Method::GET,
        format!("{base}/{campaign}/{stage}/vote?investorAddress=0xno1"),
        None,
    )
    .await?;

    let results = call(
        &client,
        Method::GET,
        format!("{base}/results/{campaign}/{stage}"),
        None,
    )
    .await?;

    println!(
        "Yes: {}, No: {}, Over: {}",
        results["yes"], results["no"], results["over"]
    );

    Ok(())
}
