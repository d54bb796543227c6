//! Feed Translator
//!
//! Projects decoded wire frames onto the public model in `domain::feed`.
//!
//! # Variant Mapping
//!
//! | Wire variant              | Copied groups                                         |
//! |---------------------------|-------------------------------------------------------|
//! | `ltpc`                    | LTPC                                                  |
//! | `fullFeed.marketFF`       | LTPC, depth, greeks, OHLC, atp/vtt/oi/iv/tbq/tsq      |
//! | `fullFeed.indexFF`        | LTPC, OHLC                                            |
//! | `firstLevelWithGreeks`    | LTPC, best bid/ask, greeks, vtt/oi/iv                 |
//!
//! Groups the wire message does not carry stay `None`/empty. Frames with an
//! unknown outer tag translate to nothing.

use std::collections::HashMap;

use super::codec::{FeedType, RawFeedMessage};
use super::proto;
use crate::domain::feed::{
    FeedData, FirstLevelWithGreeks, FullFeed, IndexFullFeed, LiveFeedMessage, Ltpc,
    MarketFullFeed, MarketInfoMessage, MarketStatus, Ohlc, OptionGreeks, Quote, RequestMode,
    TranslatedMessage,
};
use crate::domain::subscription::InstrumentKey;

/// Translate a decoded frame.
///
/// Returns `None` for frames with an unrecognized outer type.
#[must_use]
pub fn translate(raw: RawFeedMessage) -> Option<TranslatedMessage> {
    match raw.feed_type {
        FeedType::MarketInfo => Some(TranslatedMessage::MarketInfo(market_info(
            raw.market_info,
            raw.current_ts,
        ))),
        FeedType::LiveFeed | FeedType::InitialFeed => {
            let feeds = raw
                .feeds
                .into_iter()
                .map(|(key, feed)| (InstrumentKey::from(key), feed_data(feed)))
                .collect();

            Some(TranslatedMessage::LiveFeed(LiveFeedMessage {
                feeds,
                current_ts: raw.current_ts,
                initial: raw.feed_type == FeedType::InitialFeed,
            }))
        }
        FeedType::Other(tag) => {
            tracing::trace!(tag, "Ignoring feed frame with unknown type");
            None
        }
    }
}

fn market_info(info: Option<proto::MarketInfo>, current_ts: i64) -> MarketInfoMessage {
    let segment_status: HashMap<String, MarketStatus> = info
        .map(|i| i.segment_status)
        .unwrap_or_default()
        .into_iter()
        .map(|(segment, code)| (segment, MarketStatus::from_code(code)))
        .collect();

    MarketInfoMessage {
        segment_status,
        current_ts,
    }
}

fn feed_data(feed: proto::Feed) -> FeedData {
    let request_mode = request_mode(feed.request_mode);

    let mut data = FeedData {
        request_mode,
        ..FeedData::default()
    };

    match feed.feed_union {
        Some(proto::feed::FeedUnion::Ltpc(ltpc)) => {
            data.ltpc = Some(self::ltpc(ltpc));
        }
        Some(proto::feed::FeedUnion::FullFeed(full)) => {
            data.full_feed = full_feed(full);
        }
        Some(proto::feed::FeedUnion::FirstLevelWithGreeks(first)) => {
            data.first_level_with_greeks = Some(first_level(first));
        }
        None => {}
    }

    data
}

fn request_mode(code: i32) -> Option<RequestMode> {
    match proto::RequestMode::try_from(code).ok()? {
        proto::RequestMode::Ltpc => Some(RequestMode::Ltpc),
        proto::RequestMode::FullD5 => Some(RequestMode::FullD5),
        proto::RequestMode::OptionGreeks => Some(RequestMode::OptionGreeks),
        proto::RequestMode::FullD30 => Some(RequestMode::FullD30),
    }
}

fn full_feed(full: proto::FullFeed) -> Option<FullFeed> {
    match full.full_feed_union? {
        proto::full_feed::FullFeedUnion::MarketFf(market) => {
            Some(FullFeed::Market(MarketFullFeed {
                ltpc: market.ltpc.map(ltpc),
                market_level: market
                    .market_level
                    .map(|level| level.bid_ask_quote.into_iter().map(quote).collect())
                    .unwrap_or_default(),
                option_greeks: market.option_greeks.map(greeks),
                market_ohlc: ohlc_list(market.market_ohlc),
                atp: market.atp,
                vtt: market.vtt,
                oi: market.oi,
                iv: market.iv,
                tbq: market.tbq,
                tsq: market.tsq,
            }))
        }
        proto::full_feed::FullFeedUnion::IndexFf(index) => Some(FullFeed::Index(IndexFullFeed {
            ltpc: index.ltpc.map(ltpc),
            market_ohlc: ohlc_list(index.market_ohlc),
        })),
    }
}

fn first_level(first: proto::FirstLevelWithGreeks) -> FirstLevelWithGreeks {
    FirstLevelWithGreeks {
        ltpc: first.ltpc.map(ltpc),
        first_depth: first.first_depth.map(quote),
        option_greeks: first.option_greeks.map(greeks),
        vtt: first.vtt,
        oi: first.oi,
        iv: first.iv,
    }
}

const fn ltpc(wire: proto::Ltpc) -> Ltpc {
    Ltpc {
        ltp: wire.ltp,
        ltt: wire.ltt,
        ltq: wire.ltq,
        cp: wire.cp,
    }
}

const fn quote(wire: proto::Quote) -> Quote {
    Quote {
        bid_q: wire.bid_q,
        bid_p: wire.bid_p,
        ask_q: wire.ask_q,
        ask_p: wire.ask_p,
    }
}

const fn greeks(wire: proto::OptionGreeks) -> OptionGreeks {
    OptionGreeks {
        delta: wire.delta,
        theta: wire.theta,
        gamma: wire.gamma,
        vega: wire.vega,
        rho: wire.rho,
    }
}

fn ohlc_list(wire: Option<proto::MarketOhlc>) -> Vec<Ohlc> {
    wire.map(|m| {
        m.ohlc
            .into_iter()
            .map(|c| Ohlc {
                interval: c.interval,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.vol,
                ts: c.ts,
            })
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(feeds: Vec<(&str, proto::Feed)>) -> RawFeedMessage {
        RawFeedMessage {
            feed_type: FeedType::LiveFeed,
            current_ts: 1_700_000_000_000,
            feeds: feeds
                .into_iter()
                .map(|(k, f)| (k.to_string(), f))
                .collect(),
            market_info: None,
        }
    }

    fn wire_ltpc(ltp: f64, ltq: i64) -> proto::Ltpc {
        proto::Ltpc {
            ltp,
            ltt: 1_700_000_000_000,
            ltq,
            cp: 100.0,
        }
    }

    fn only_feed(message: Option<TranslatedMessage>, key: &str) -> FeedData {
        let Some(TranslatedMessage::LiveFeed(live)) = message else {
            panic!("expected live feed message");
        };
        live.feeds[&InstrumentKey::new(key)].clone()
    }

    #[test]
    fn ltpc_variant_copies_only_ltpc() {
        let raw = live(vec![(
            "NSE_EQ|X",
            proto::Feed {
                request_mode: proto::RequestMode::Ltpc as i32,
                feed_union: Some(proto::feed::FeedUnion::Ltpc(wire_ltpc(101.5, 0))),
            },
        )]);

        let data = only_feed(translate(raw), "NSE_EQ|X");

        let ltpc = data.ltpc.unwrap();
        assert!((ltpc.ltp - 101.5).abs() < f64::EPSILON);
        assert_eq!(ltpc.ltq, 0);
        assert!(data.full_feed.is_none());
        assert!(data.first_level_with_greeks.is_none());
        assert_eq!(data.request_mode, Some(RequestMode::Ltpc));
    }

    #[test]
    fn market_full_feed_copies_all_groups() {
        let market = proto::MarketFullFeed {
            ltpc: Some(wire_ltpc(250.0, 5)),
            market_level: Some(proto::MarketLevel {
                bid_ask_quote: vec![
                    proto::Quote {
                        bid_q: 10,
                        bid_p: 249.9,
                        ask_q: 12,
                        ask_p: 250.1,
                    },
                    proto::Quote {
                        bid_q: 20,
                        bid_p: 249.8,
                        ask_q: 22,
                        ask_p: 250.2,
                    },
                ],
            }),
            option_greeks: Some(proto::OptionGreeks {
                delta: 0.5,
                theta: -0.1,
                gamma: 0.01,
                vega: 0.2,
                rho: 0.03,
            }),
            market_ohlc: Some(proto::MarketOhlc {
                ohlc: vec![proto::Ohlc {
                    interval: "1d".to_string(),
                    open: 240.0,
                    high: 255.0,
                    low: 238.0,
                    close: 250.0,
                    vol: 1_000,
                    ts: 1_700_000_000_000,
                }],
            }),
            atp: 248.7,
            vtt: 123_456,
            oi: 10.0,
            iv: 0.25,
            tbq: 5_000.0,
            tsq: 4_000.0,
        };
        let raw = live(vec![(
            "NSE_FO|OPT",
            proto::Feed {
                request_mode: proto::RequestMode::FullD5 as i32,
                feed_union: Some(proto::feed::FeedUnion::FullFeed(proto::FullFeed {
                    full_feed_union: Some(proto::full_feed::FullFeedUnion::MarketFf(market)),
                })),
            },
        )]);

        let data = only_feed(translate(raw), "NSE_FO|OPT");

        assert!(data.ltpc.is_none());
        assert!(data.first_level_with_greeks.is_none());
        let Some(FullFeed::Market(ff)) = data.full_feed else {
            panic!("expected market full feed");
        };
        assert_eq!(ff.ltpc.unwrap().ltq, 5);
        assert_eq!(ff.market_level.len(), 2);
        assert_eq!(ff.market_level[1].ask_q, 22);
        assert!((ff.option_greeks.unwrap().delta - 0.5).abs() < f64::EPSILON);
        assert_eq!(ff.market_ohlc.len(), 1);
        assert_eq!(ff.market_ohlc[0].volume, 1_000);
        assert_eq!(ff.vtt, 123_456);
        assert!((ff.tbq - 5_000.0).abs() < f64::EPSILON);
        assert_eq!(data.request_mode, Some(RequestMode::FullD5));
    }

    #[test]
    fn market_full_feed_omits_absent_groups() {
        let market = proto::MarketFullFeed {
            ltpc: Some(wire_ltpc(10.0, 1)),
            ..Default::default()
        };
        let raw = live(vec![(
            "NSE_EQ|Y",
            proto::Feed {
                request_mode: 0,
                feed_union: Some(proto::feed::FeedUnion::FullFeed(proto::FullFeed {
                    full_feed_union: Some(proto::full_feed::FullFeedUnion::MarketFf(market)),
                })),
            },
        )]);

        let data = only_feed(translate(raw), "NSE_EQ|Y");
        let Some(FullFeed::Market(ff)) = data.full_feed else {
            panic!("expected market full feed");
        };
        assert!(ff.market_level.is_empty());
        assert!(ff.option_greeks.is_none());
        assert!(ff.market_ohlc.is_empty());
        assert!(ff.atp.abs() < f64::EPSILON);
    }

    #[test]
    fn index_full_feed_copies_ltpc_and_ohlc_only() {
        let index = proto::IndexFullFeed {
            ltpc: Some(wire_ltpc(22_000.5, 0)),
            market_ohlc: Some(proto::MarketOhlc {
                ohlc: vec![proto::Ohlc {
                    interval: "I1".to_string(),
                    close: 22_000.5,
                    ..Default::default()
                }],
            }),
        };
        let raw = live(vec![(
            "NSE_INDEX|Nifty 50",
            proto::Feed {
                request_mode: proto::RequestMode::FullD5 as i32,
                feed_union: Some(proto::feed::FeedUnion::FullFeed(proto::FullFeed {
                    full_feed_union: Some(proto::full_feed::FullFeedUnion::IndexFf(index)),
                })),
            },
        )]);

        let data = only_feed(translate(raw), "NSE_INDEX|Nifty 50");
        let Some(FullFeed::Index(ff)) = data.full_feed else {
            panic!("expected index full feed");
        };
        assert!((ff.ltpc.unwrap().ltp - 22_000.5).abs() < f64::EPSILON);
        assert_eq!(ff.market_ohlc[0].interval, "I1");
    }

    #[test]
    fn first_level_with_greeks_copies_its_groups() {
        let first = proto::FirstLevelWithGreeks {
            ltpc: Some(wire_ltpc(45.0, 75)),
            first_depth: Some(proto::Quote {
                bid_q: 75,
                bid_p: 44.9,
                ask_q: 150,
                ask_p: 45.1,
            }),
            option_greeks: Some(proto::OptionGreeks {
                delta: -0.4,
                ..Default::default()
            }),
            vtt: 9_000,
            oi: 120_000.0,
            iv: 0.18,
        };
        let raw = live(vec![(
            "NSE_FO|PUT",
            proto::Feed {
                request_mode: proto::RequestMode::OptionGreeks as i32,
                feed_union: Some(proto::feed::FeedUnion::FirstLevelWithGreeks(first)),
            },
        )]);

        let data = only_feed(translate(raw), "NSE_FO|PUT");

        assert!(data.ltpc.is_none());
        assert!(data.full_feed.is_none());
        let first = data.first_level_with_greeks.unwrap();
        assert_eq!(first.first_depth.unwrap().ask_q, 150);
        assert!((first.option_greeks.unwrap().delta + 0.4).abs() < f64::EPSILON);
        assert_eq!(first.vtt, 9_000);
        assert_eq!(data.request_mode, Some(RequestMode::OptionGreeks));
    }

    #[test]
    fn empty_union_yields_empty_entry() {
        let raw = live(vec![(
            "NSE_EQ|Z",
            proto::Feed {
                request_mode: 99,
                feed_union: None,
            },
        )]);

        let data = only_feed(translate(raw), "NSE_EQ|Z");
        assert_eq!(data, FeedData::default());
    }

    #[test]
    fn initial_feed_is_flagged() {
        let mut raw = live(vec![]);
        raw.feed_type = FeedType::InitialFeed;

        let Some(TranslatedMessage::LiveFeed(message)) = translate(raw) else {
            panic!("expected live feed message");
        };
        assert!(message.initial);
        assert!(message.feeds.is_empty());
    }

    #[test]
    fn market_info_maps_codes_with_fallback() {
        let mut segment_status = HashMap::new();
        segment_status.insert("NSE_EQ".to_string(), proto::MarketStatus::NormalClose as i32);
        segment_status.insert("MCX_FO".to_string(), 17);
        let raw = RawFeedMessage {
            feed_type: FeedType::MarketInfo,
            current_ts: 42,
            feeds: HashMap::new(),
            market_info: Some(proto::MarketInfo { segment_status }),
        };

        let Some(TranslatedMessage::MarketInfo(info)) = translate(raw) else {
            panic!("expected market info message");
        };
        assert_eq!(info.current_ts, 42);
        assert_eq!(info.segment_status["NSE_EQ"], MarketStatus::NormalClose);
        assert_eq!(info.segment_status["MCX_FO"], MarketStatus::NormalOpen);
    }

    #[test]
    fn unknown_type_is_ignored() {
        let mut raw = live(vec![(
            "NSE_EQ|X",
            proto::Feed {
                request_mode: 0,
                feed_union: Some(proto::feed::FeedUnion::Ltpc(wire_ltpc(1.0, 1))),
            },
        )]);
        raw.feed_type = FeedType::Other(7);

        assert!(translate(raw).is_none());
    }
}
