use mailwire_http::{AttachmentInput, MailClient, SendEmail, TemplateVars};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = MailClient::from_env().map_err(anyhow::Error::msg)?;
    let recipient = std::env::var("MAILWIRE_TO")?;

    let audience = client.create_audience("Demo readers").await?;
    let audience_id = audience["id"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("audience response has no id: {audience}"))?
        .to_owned();

    let vars: TemplateVars = [("name".to_owned(), "Kit".to_owned())].into_iter().collect();
    let email = SendEmail::new(
        "demo@example.com",
        [recipient],
        "Welcome, {{name}}",
        "<p>Hello {{name}}, your report is attached.</p>",
    )
    .add_to_audience(audience_id)
    .with_attachment(AttachmentInput::bytes("report.csv", b"id,total\n1,42\n".to_vec()));

    let sent = client.send_template_email(email, &vars).await?;
    println!("{sent:#}");

    Ok(())
}
