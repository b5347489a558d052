//! Prometheus text exposition for the region service.

use crate::ServiceConfig;

/// Render the `service_up` and `service_info` gauges for this instance.
pub fn render_prometheus(config: &ServiceConfig) -> String {
    let labels = format!(
        "version=\"{}\",region=\"{}\"",
        escape_label(&config.version),
        escape_label(&config.region)
    );

    let mut out = String::new();

    out.push_str("# HELP service_up Whether the service is up.\n");
    out.push_str("# TYPE service_up gauge\n");
    out.push_str(&format!("service_up{{{labels}}} 1\n"));

    out.push_str("# HELP service_info Version and region of the running service.\n");
    out.push_str("# TYPE service_info gauge\n");
    out.push_str(&format!("service_info{{{labels}}} 1\n"));

    out
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_both_gauges() {
        let output = render_prometheus(&ServiceConfig::new("v2", "region-eu-west", 0.0));

        assert!(output.contains("# TYPE service_up gauge"));
        assert!(output.contains("# TYPE service_info gauge"));
        assert!(output.contains("service_up{version=\"v2\",region=\"region-eu-west\"} 1"));
        assert!(output.contains("service_info{version=\"v2\",region=\"region-eu-west\"} 1"));
    }

    #[test]
    fn escapes_label_values() {
        let output = render_prometheus(&ServiceConfig::new("v\"2", "a\\b", 0.0));
        assert!(output.contains("version=\"v\\\"2\""));
        assert!(output.contains("region=\"a\\\\b\""));
    }

    #[test]
    fn every_sample_has_labels() {
        let output = render_prometheus(&ServiceConfig::new("v1", "us-west", 0.0));
        for line in output.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            assert!(line.contains('{') && line.contains('}'), "line should have labels: {line}");
        }
    }
}
