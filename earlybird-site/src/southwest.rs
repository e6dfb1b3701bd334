//! Page extraction for southwest.com's itinerary, check-in and boarding pass pages.
//!
//! Structural matches only (ids, semantic classes); no positional scraping beyond
//! "first form" inside an identified container.

use earlybird_core::{CheckinForm, FlightBlock, FormLookupError, SiteMarkup};
use earlybird_shared::{BoardingGroup, BoardingPosition};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

const LOOKUP_FORM_ID: &str = "itineraryLookup";
const CHECKIN_CONTAINER_ID: &str = "mainContentWrapper";
const ERROR_TITLE: &str = "Error";

pub struct SouthwestMarkup {
    lookup_form: Selector,
    checkin_container: Selector,
    form_with_action: Selector,
    title: Selector,
    named_input: Selector,
    flight_routing: Selector,
    flight_details: Selector,
    flight_number: Selector,
    routing_stops: Selector,
    routing_times: Selector,
    travel_date: Selector,
    flight_number_digits: Regex,
    depart_airport: Regex,
    time_of_day: Regex,
    boarding_group: Regex,
    boarding_number: Regex,
}

impl SouthwestMarkup {
    pub fn new() -> Self {
        Self {
            lookup_form: selector(&format!("form#{}[action]", LOOKUP_FORM_ID)),
            checkin_container: selector(&format!("div#{}", CHECKIN_CONTAINER_ID)),
            form_with_action: selector("form[action]"),
            title: selector("title"),
            named_input: selector("input[name]"),
            flight_routing: selector("td.flightRouting"),
            flight_details: selector("td.flightInfoDetails"),
            flight_number: selector("td.flightNumberSeparator"),
            routing_stops: selector("td.routingDetailsStops"),
            routing_times: selector("td.routingDetailsTimes"),
            travel_date: selector("span.travelDateTime"),
            flight_number_digits: pattern(r"^\D*(\d+)"),
            depart_airport: pattern(r"(?s)Depart.*?\(([A-Za-z]{3})\)"),
            time_of_day: pattern(r"(?i)\b(\d{1,2}:\d{2})\s*([AP]M)\b"),
            boarding_group: pattern(r"boarding([ABC])\.gif"),
            boarding_number: pattern(r#"bpPassNum"[^>]*>\s*(\d+)"#),
        }
    }

    fn routing_block(&self, routing: ElementRef<'_>, details: Option<ElementRef<'_>>) -> FlightBlock {
        let flight_number = routing
            .select(&self.flight_number)
            .next()
            .map(|td| text_of(td))
            .and_then(|text| {
                self.flight_number_digits
                    .captures(&text)
                    .and_then(|c| c[1].parse().ok())
            });

        let depart_airport = routing.select(&self.routing_stops).next().and_then(|td| {
            self.depart_airport
                .captures(&text_of(td))
                .map(|c| c[1].to_ascii_uppercase())
        });

        let time_of_day = routing.select(&self.routing_times).next().and_then(|td| {
            self.time_of_day
                .captures(&text_of(td))
                .map(|c| format!("{} {}", &c[1], c[2].to_ascii_uppercase()))
        });

        let travel_date = details
            .and_then(|d| d.select(&self.travel_date).next())
            .and_then(|span| span.text().map(str::trim).find(|t| !t.is_empty()))
            .map(collapse_whitespace);

        FlightBlock {
            flight_number,
            depart_airport,
            time_of_day,
            travel_date,
        }
    }

    /// Hidden fields plus the selection controls the next step expects echoed back.
    fn echo_fields(&self, scope: ElementRef<'_>) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = Vec::new();
        for input in scope.select(&self.named_input) {
            let el = input.value();
            let (Some(name), kind) = (el.attr("name"), el.attr("type").unwrap_or("text")) else {
                continue;
            };
            let value = el.attr("value").unwrap_or_default().to_string();
            match kind.to_ascii_lowercase().as_str() {
                "hidden" | "checkbox" => fields.push((name.to_string(), value)),
                "radio" => {
                    // One value per radio group: the checked one, else the first offered.
                    let checked = el.attr("checked").is_some();
                    match fields.iter().position(|(n, _)| n == name) {
                        Some(i) if checked => fields[i].1 = value,
                        Some(_) => {}
                        None => fields.push((name.to_string(), value)),
                    }
                }
                _ => {}
            }
        }
        fields
    }
}

impl Default for SouthwestMarkup {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteMarkup for SouthwestMarkup {
    fn extract_lookup_target(&self, page: &str) -> Option<String> {
        let doc = Html::parse_document(page);
        let form = doc.select(&self.lookup_form).next()?;
        form.value().attr("action").map(|a| a.trim().to_string())
    }

    fn extract_checkin_target(&self, page: &str) -> Result<String, FormLookupError> {
        let doc = Html::parse_document(page);
        // The check-in form has no id of its own.
        let container = doc
            .select(&self.checkin_container)
            .next()
            .ok_or_else(|| FormLookupError::MissingContainer(CHECKIN_CONTAINER_ID.to_string()))?;

        container
            .select(&self.form_with_action)
            .next()
            .and_then(|form| form.value().attr("action"))
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| FormLookupError::MissingForm(CHECKIN_CONTAINER_ID.to_string()))
    }

    fn extract_checkin_form(&self, page: &str) -> CheckinForm {
        let doc = Html::parse_document(page);

        let title = doc.select(&self.title).next().map(text_of);
        if title.as_deref() == Some(ERROR_TITLE) {
            return CheckinForm::Rejected;
        }

        match doc.select(&self.form_with_action).next() {
            Some(form) => CheckinForm::Ready {
                action: form.value().attr("action").map(|a| a.trim().to_string()),
                hidden_fields: self.echo_fields(form),
            },
            None => CheckinForm::Ready {
                action: None,
                hidden_fields: self.echo_fields(doc.root_element()),
            },
        }
    }

    fn extract_flight_blocks(&self, page: &str) -> Vec<FlightBlock> {
        let doc = Html::parse_document(page);
        let details: Vec<ElementRef<'_>> = doc.select(&self.flight_details).collect();

        doc.select(&self.flight_routing)
            .enumerate()
            .map(|(i, routing)| self.routing_block(routing, details.get(i).copied()))
            .collect()
    }

    fn extract_boarding_position(&self, page: &str) -> Option<BoardingPosition> {
        let group = self
            .boarding_group
            .captures(page)
            .and_then(|c| c[1].chars().next())
            .and_then(BoardingGroup::from_letter)?;
        let number = self
            .boarding_number
            .captures(page)
            .and_then(|c| c[1].parse().ok())?;
        Some(BoardingPosition { group, number })
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e:?}"))
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|e| panic!("invalid pattern {re:?}: {e}"))
}

// Text nodes are joined with spaces: `<span>Depart</span><strong>11:15 AM</strong>`
// must not read as `Depart11:15 AM`.
fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
