// Alert report rendered for notification channels
use crate::model::Alert;
use chrono::{DateTime, Local, Utc};

#[derive(Debug, Clone)]
pub struct AlertReport {
    pub product: String,
    pub alerts: Vec<Alert>,
    pub generated_at: DateTime<Utc>,
}

impl AlertReport {
    pub fn new(product: &str, alerts: Vec<Alert>) -> Self {
        Self {
            product: product.to_string(),
            alerts,
            generated_at: Utc::now(),
        }
    }

    pub fn subject(&self) -> String {
        let noun = if self.alerts.len() == 1 { "alert" } else { "alerts" };
        format!("🚨 Price Alert - {} ({} {})", self.product, self.alerts.len(), noun)
    }

    fn local_time(&self) -> String {
        self.generated_at
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M:%S")
            .to_string()
    }

    pub fn text(&self) -> String {
        let mut out = format!("{}\n{}\n", self.subject(), self.local_time());
        for alert in &self.alerts {
            out.push_str(&format!(
                "\n🔔 {}\n📦 {}\n💰 €{:.2} → {}\n⚠️ {}\n🔗 {}\n",
                alert.site,
                alert.title,
                alert.previous_price.round_dp(2),
                alert.price_formatted,
                alert.reasons_text(),
                alert.url
            ));
        }
        out
    }

    pub fn html(&self) -> String {
        let mut html = format!(
            r#"<html>
<head>
<style>
  body {{ font-family: Arial, sans-serif; }}
  .alert {{ border: 2px solid #ff4444; border-radius: 5px; padding: 15px; margin: 10px 0; background-color: #fff5f5; }}
  .price-drop {{ color: #ff4444; font-weight: bold; }}
  .price-current {{ color: #00aa00; font-size: 1.2em; font-weight: bold; }}
  .site-name {{ color: #0066cc; font-weight: bold; }}
</style>
</head>
<body>
<h2>🚨 Price Alert - {product}</h2>
<p><strong>Date:</strong> {date}</p>
"#,
            product = escape(&self.product),
            date = self.local_time(),
        );

        for alert in &self.alerts {
            html.push_str(&format!(
                r#"<div class="alert">
  <h3 class="site-name">{site}</h3>
  <p><strong>Product:</strong> {title}</p>
  <p><strong>Current price:</strong> <span class="price-current">{current}</span></p>
  <p><strong>Previous price:</strong> €{previous:.2}</p>
  <p class="price-drop"><strong>Alert:</strong> {reasons}</p>
  <p><a href="{url}" target="_blank">🛒 Go to product</a></p>
</div>
"#,
                site = escape(&alert.site),
                title = escape(&alert.title),
                current = escape(&alert.price_formatted),
                previous = alert.previous_price.round_dp(2),
                reasons = escape(&alert.reasons_text()),
                url = escape(&alert.url),
            ));
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlertReason;
    use rust_decimal::Decimal;

    fn report() -> AlertReport {
        AlertReport::new(
            "Samsung Galaxy S23 256GB",
            vec![Alert {
                site: "Amazon.it".into(),
                title: "Galaxy S23 <Black>".into(),
                current_price: Decimal::from(427),
                previous_price: Decimal::from(450),
                price_formatted: "€427,00".into(),
                url: "https://www.amazon.it/dp/B0C78GHQRJ?a=1&b=2".into(),
                reasons: vec![AlertReason::AbsoluteDrop { amount: Decimal::from(23) }],
                timestamp: Utc::now(),
            }],
        )
    }

    #[test]
    fn subject_counts_alerts() {
        assert_eq!(report().subject(), "🚨 Price Alert - Samsung Galaxy S23 256GB (1 alert)");
    }

    #[test]
    fn text_lists_prices_and_reasons() {
        let text = report().text();
        assert!(text.contains("€450.00 → €427,00"));
        assert!(text.contains("Drop of €23.00"));
    }

    #[test]
    fn html_is_escaped() {
        let html = report().html();
        assert!(html.contains("Galaxy S23 &lt;Black&gt;"));
        assert!(html.contains("?a=1&amp;b=2"));
        assert!(html.contains("<p><strong>Previous price:</strong> €450.00</p>"));
    }
}
