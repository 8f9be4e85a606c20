use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::dates::parse_day;
use crate::fund::Fund;
use crate::provider::{HistoryProvider, RatePoint};

const ENDPOINT: &str = "https://www.kh.hu/megtakaritas-befektetes/hozamszamlalo-befektetesi-alap?\
p_p_id=yieldcalculator_WAR_yieldcalculatorportlet&p_p_lifecycle=2&p_p_state=normal&\
p_p_mode=view&p_p_resource_id=cmdGetChartData";

const FIELD_DATE_FROM: &str = "yieldcalculator_WAR_yieldcalculatorportlet_dateFrom";
const FIELD_DATE_TO: &str = "_yieldcalculator_WAR_yieldcalculatorportlet_dateTo";
const FIELD_INVESTMENTS: &str = "_yieldcalculator_WAR_yieldcalculatorportlet_investments";

/// Display name prefix of the provider's own series.
pub const SERIES_PREFIX: &str = "K&H";

#[derive(Deserialize, Debug, Clone)]
pub struct ChartResponse {
    pub diagram: Diagram,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Diagram {
    pub series: Vec<Series>,
    #[serde(rename = "scale-x")]
    pub scale_x: ScaleX,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Series {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub values: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScaleX {
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesMatch {
    /// A series named with the provider prefix was found at this index.
    Prefix(usize),
    /// No series matched, the first one was used.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct ChartData {
    pub series_match: SeriesMatch,
    pub series_name: Option<String>,
    pub points: Vec<RatePoint>,
}

impl ChartResponse {
    pub fn select_series(&self) -> Result<(SeriesMatch, &Series)> {
        let series = &self.diagram.series;
        if series.is_empty() {
            bail!("Chart response contains no data series");
        }
        let found = series.iter().position(|s| {
            s.text
                .as_deref()
                .is_some_and(|text| text.starts_with(SERIES_PREFIX))
        });
        Ok(match found {
            Some(index) => (SeriesMatch::Prefix(index), &series[index]),
            None => (SeriesMatch::Fallback, &series[0]),
        })
    }

    /// Pairs every x axis label with the selected series' value at the same index.
    pub fn into_chart_data(self) -> Result<ChartData> {
        let (series_match, series) = self.select_series()?;

        let mut points = Vec::with_capacity(self.diagram.scale_x.labels.len());
        for (index, label) in self.diagram.scale_x.labels.iter().enumerate() {
            let rate = series
                .values
                .get(index)
                .ok_or_else(|| anyhow!("No value for label {} at index {}", label, index))?;
            points.push(RatePoint::new(parse_day(label)? * 1000, *rate));
        }

        Ok(ChartData {
            series_match,
            series_name: series.text.clone(),
            points,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct KhProvider {
    client: Client,
    strict_series: bool,
}

impl KhProvider {
    pub fn new(strict_series: bool) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            strict_series,
        })
    }

    pub fn parse_body(&self, fund: &Fund, body: &str) -> Result<ChartData> {
        let response: ChartResponse = serde_json::from_str(body)
            .with_context(|| format!("Unexpected chart data for {}", fund.isin))?;
        let data = response.into_chart_data()?;

        match (data.series_match, &data.series_name) {
            (SeriesMatch::Prefix(_), name) => {
                info!("Using {} data series", name.as_deref().unwrap_or_default());
            }
            (SeriesMatch::Fallback, name) => {
                if self.strict_series {
                    bail!(
                        "No {} data series for {}, refusing to use {:?}",
                        SERIES_PREFIX,
                        fund.isin,
                        name
                    );
                }
                warn!(
                    "No {} data series for {}, falling back to first series {:?}",
                    SERIES_PREFIX, fund.isin, name
                );
            }
        }

        Ok(data)
    }

    /// A non-200 status is logged but the body is still parsed, it often carries the chart.
    pub fn handle_response(
        &self,
        fund: &Fund,
        status: StatusCode,
        body: &str,
    ) -> Result<Vec<RatePoint>> {
        if status != StatusCode::OK {
            error!(
                "Error occurred: {} {}: {}, size: {}",
                ENDPOINT,
                fund.isin,
                status,
                body.len()
            );
        }

        Ok(self.parse_body(fund, body)?.points)
    }
}

impl HistoryProvider for KhProvider {
    async fn get_history(&self, fund: &Fund, from_ms: i64, to_ms: i64) -> Result<Vec<RatePoint>> {
        let form = [
            (FIELD_DATE_FROM, from_ms.to_string()),
            (FIELD_DATE_TO, to_ms.to_string()),
            (FIELD_INVESTMENTS, fund.isin.clone()),
            ("ajax", "0".to_string()),
        ];
        debug!("POST {} for {} ({} - {})", ENDPOINT, fund.isin, from_ms, to_ms);

        let res = self.client.post(ENDPOINT).form(&form).send().await?;
        let status = res.status();
        let body = res.text().await?;
        self.handle_response(fund, status, &body)
    }
}
