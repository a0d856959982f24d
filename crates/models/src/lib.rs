pub mod config;
pub mod error;
pub mod ocr;

pub use config::*;
pub use error::*;
pub use ocr::*;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json;

    #[test]
    fn test_language_hint_validation() {
        assert_eq!("eng".parse::<LanguageHint>().unwrap().as_str(), "eng");
        assert_eq!(
            "eng+chi_sim".parse::<LanguageHint>().unwrap().as_str(),
            "eng+chi_sim"
        );
        assert!("".parse::<LanguageHint>().is_err());
        assert!("eng+".parse::<LanguageHint>().is_err());
        assert!("eng;rm -rf".parse::<LanguageHint>().is_err());
        assert!("../eng".parse::<LanguageHint>().is_err());
        assert!("a".repeat(65).parse::<LanguageHint>().is_err());
    }

    #[test]
    fn test_region_from_str() {
        let r: Region = "10, 20,30,40".parse().unwrap();
        assert_eq!(
            r,
            Region {
                x: 10,
                y: 20,
                width: 30,
                height: 40
            }
        );
        assert!("1,2,3".parse::<Region>().is_err());
        assert!("1,2,3,-4".parse::<Region>().is_err());
        assert!("a,b,c,d".parse::<Region>().is_err());
    }

    #[test]
    fn test_region_bounds() {
        let r = Region {
            x: 10,
            y: 10,
            width: 90,
            height: 40,
        };
        assert!(r.check_within(100, 50).is_ok());
        assert!(r.check_within(99, 50).is_err());
        let empty = Region { width: 0, ..r };
        assert!(matches!(
            empty.check_within(1000, 1000),
            Err(OcrError::InvalidRegion { .. })
        ));
        let huge = Region {
            x: u32::MAX,
            y: 0,
            width: u32::MAX,
            height: 1,
        };
        assert!(huge.check_within(u32::MAX, 1).is_err());
    }

    #[test]
    fn test_block_level_from_str() {
        assert_eq!("word".parse::<BlockLevel>().unwrap(), BlockLevel::Word);
        assert_eq!("LINE".parse::<BlockLevel>().unwrap(), BlockLevel::Line);
        assert_eq!("par".parse::<BlockLevel>().unwrap(), BlockLevel::Paragraph);
        assert_eq!("block".parse::<BlockLevel>().unwrap(), BlockLevel::Block);
        assert!("page".parse::<BlockLevel>().is_err());
        assert_eq!(BlockLevel::default(), BlockLevel::Line);
    }

    #[test]
    fn test_bounding_box_union_and_translate() {
        let a = BoundingBox {
            x: 10,
            y: 10,
            width: 10,
            height: 10,
        };
        let b = BoundingBox {
            x: 30,
            y: 5,
            width: 5,
            height: 10,
        };
        assert_eq!(
            a.union(&b),
            BoundingBox {
                x: 10,
                y: 5,
                width: 25,
                height: 15
            }
        );
        assert_eq!(a.translate(5, 7).x, 15);
        assert_eq!(a.translate(5, 7).y, 17);
        assert_eq!(a.translate(5, 7).width, 10);
    }

    #[test]
    fn test_json_request_deny_unknown_fields() {
        let json = r#"{
            "image_url": "https://example.com/a.png",
            "language": "eng",
            "UnknownField": "should_fail"
        }"#;

        let result: Result<OcrJsonRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unknown field"));
    }

    #[test]
    fn test_json_request_region_object() {
        let json = r#"{
            "image_base64": "aGVsbG8=",
            "region": {"x": 1, "y": 2, "width": 3, "height": 4}
        }"#;
        let req: OcrJsonRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.region.unwrap().height, 4);
        assert!(req.image_url.is_none());
    }

    #[test]
    fn test_ocr_response_shape() {
        let response = OcrResponse {
            request_id: uuid::Uuid::new_v4(),
            text: "HELLO".to_string(),
            confidence: 0.93,
            blocks: vec![TextBlockResponse {
                text: "HELLO".to_string(),
                confidence: 0.93,
                level: BlockLevel::Line,
                bbox: BoundingBox {
                    x: 1,
                    y: 2,
                    width: 3,
                    height: 4,
                },
            }],
            language: "eng".to_string(),
            width: 100,
            height: 50,
            image_sha256: "ab".to_string(),
            duration_ms: 12,
            completed_at: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["text"], "HELLO");
        assert_eq!(json["blocks"][0]["level"], "line");
        assert_eq!(json["blocks"][0]["bbox"]["width"], 3);
    }
}
