//! Output driver: the indexing HTTP sink.
//!
//! Grounded on `es_start`/`es_payload`/`es_stop` in `output_es.c`. `curl_easy_*` options
//! (keepalive timings, one reused handle) map onto a single `reqwest::blocking::Client`
//! built once in `start` and reused across every `payload` call.

use chrono::{NaiveDate, Utc};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::driver::{DriverOptions, OutputDriver};
use crate::error::DriverError;

// `reqwest` exposes only a single TCP keepalive idle-time knob, not curl's separate
// idle/interval pair (`CURLOPT_TCP_KEEPIDLE`/`CURLOPT_TCP_KEEPINTVL`); the idle value is
// kept, the interval has no equivalent to carry over.
const KEEPALIVE_IDLE: Duration = Duration::from_secs(300);

pub struct ElasticsearchOutput {
    options: DriverOptions,
    url: Option<String>,
    verbose: bool,
    client: Option<Client>,
    day_stamp: Option<NaiveDate>,
    day_text: String,
}

impl ElasticsearchOutput {
    pub fn new(options: DriverOptions) -> Self {
        ElasticsearchOutput {
            options,
            url: None,
            verbose: false,
            client: None,
            day_stamp: None,
            day_text: String::new(),
        }
    }

    fn refresh_day_stamp_if_advanced(&mut self) {
        let today = Utc::now().date_naive();
        let advanced = match self.day_stamp {
            Some(stamp) => today > stamp,
            None => true,
        };
        if advanced {
            self.day_stamp = Some(today);
            self.day_text = today.format("%Y%m%d").to_string();
        }
    }
}

impl OutputDriver for ElasticsearchOutput {
    fn start(&mut self) -> Result<(), DriverError> {
        trace!("es_start: enter");

        for opt in &self.options {
            if opt.key.eq_ignore_ascii_case("url") {
                self.url = Some(opt.value.clone());
                info!(url = %opt.value, "es_start: using url");
            } else if opt.key.eq_ignore_ascii_case("verbose") {
                self.verbose = true;
                info!("es_start: setting verbose mode on");
            } else {
                return Err(DriverError::message(
                    "es_config: unknown option",
                    opt.key.clone(),
                ));
            }
        }

        if self.url.is_none() {
            return Err(DriverError::message(
                "es_config",
                "need url to connect to",
            ));
        }

        let client = Client::builder()
            .tcp_keepalive(KEEPALIVE_IDLE)
            .build()
            .map_err(|e| DriverError::Http {
                context: "es_config: cannot build http client",
                source: e,
            })?;
        self.client = Some(client);
        self.refresh_day_stamp_if_advanced();

        trace!("es_start: success");
        Ok(())
    }

    fn payload(&mut self, message_type: &str, bytes: &[u8]) -> Result<(), DriverError> {
        trace!("es_payload: enter");

        let client = self
            .client
            .as_ref()
            .expect("payload is only called after start");
        let base_url = self
            .url
            .as_deref()
            .expect("payload is only called after start");

        self.refresh_day_stamp_if_advanced();

        let url = format!("{base_url}/logstash-{}/{message_type}", self.day_text);
        if self.verbose {
            debug!(%url, "es_payload: posting");
        }

        let response = client
            .post(&url)
            .body(bytes.to_vec())
            .send()
            .map_err(|e| DriverError::Http {
                context: "es_payload: perform",
                source: e,
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), %url, "es_payload: non-2xx response");
            return Err(DriverError::message(
                "es_payload",
                format!("non-2xx response: {}", response.status()),
            ));
        }

        trace!("es_payload: success");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        trace!("es_stop: enter");
        self.client = None;
        trace!("es_stop: success");
        Ok(())
    }
}
