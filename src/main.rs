use stepflow::core::{EntityRecord, Payload};
use stepflow::engine::FlowRuntime;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("stepflow - lookup + fixed-width demo");
    println!("====================================\n");

    // customers ─┐
    //            ├─> enrich ─> format
    // orders ────┘
    let config = serde_json::json!({
        "name": "order-report",
        "steps": [
            {"id": "customers", "type": "Noop"},
            {"id": "orders", "type": "Noop"},
            {
                "id": "enrich",
                "type": "Lookup",
                "settings": {
                    "lookup.data.source.step": "customers",
                    "lookup.key.attribute": "customer_id",
                    "lookup.value.attribute": "customer_name",
                    "replacement.key.attribute": "order_customer",
                    "replacement.value.attribute": "order_customer_name"
                }
            },
            {
                "id": "format",
                "type": "Format Fixed",
                "settings": {"fixed.length.formatter.header": true},
                "attribute_settings": [
                    {"attribute_id": "order_id", "name": "fixed.length.formatter.attribute.ordinal", "value": 1},
                    {"attribute_id": "order_id", "name": "fixed.length.formatter.attribute.length", "value": 8},
                    {"attribute_id": "order_customer_name", "name": "fixed.length.formatter.attribute.ordinal", "value": 2},
                    {"attribute_id": "order_customer_name", "name": "fixed.length.formatter.attribute.length", "value": 12},
                    {"attribute_id": "order_total", "name": "fixed.length.formatter.attribute.ordinal", "value": 3},
                    {"attribute_id": "order_total", "name": "fixed.length.formatter.attribute.length", "value": 8}
                ]
            }
        ],
        "links": [
            {"from": "customers", "to": "enrich"},
            {"from": "orders", "to": "enrich"},
            {"from": "enrich", "to": "format"}
        ],
        "model": {
            "entities": [
                {"id": "customer", "name": "CUSTOMER"},
                {"id": "order", "name": "ORDER"}
            ],
            "attributes": [
                {"id": "customer_id", "entity_id": "customer", "name": "ID"},
                {"id": "customer_name", "entity_id": "customer", "name": "NAME"},
                {"id": "order_id", "entity_id": "order", "name": "ORDER"},
                {"id": "order_customer", "entity_id": "order", "name": "CUSTOMER"},
                {"id": "order_customer_name", "entity_id": "order", "name": "CUSTOMER"},
                {"id": "order_total", "entity_id": "order", "name": "TOTAL"}
            ]
        }
    });

    let mut runtime = FlowRuntime::from_json(config)?;
    let mut lines = runtime.subscribe("format")?;
    runtime.start().await?;

    let order = |id: i64, customer: &str, total: f64| {
        EntityRecord::new()
            .with("order_id", id)
            .with("order_customer", customer)
            .with("order_total", total)
    };

    // Orders arrive first and wait for the customer table
    runtime
        .emit_from("orders", vec![order(1001, "C1", 25.5), order(1002, "C2", 9.99)], false)
        .await?;
    runtime
        .emit_from(
            "customers",
            vec![
                EntityRecord::new().with("customer_id", "C1").with("customer_name", "Ada"),
                EntityRecord::new().with("customer_id", "C2").with("customer_name", "Grace"),
            ],
            true,
        )
        .await?;
    runtime
        .emit_from("orders", vec![order(1003, "C3", 100.0)], true)
        .await?;

    runtime.stop().await?;

    while let Some(message) = lines.recv().await {
        if let Payload::Text(text) = &message.payload {
            for line in text {
                println!("|{}|", line);
            }
        }
    }

    println!("\n{}", runtime.monitor().generate_report());
    Ok(())
}
