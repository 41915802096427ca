use classifier::{Bucket, Classifier, ClassifierError, Label, DEFAULT_THRESHOLD};

#[test]
fn test_classify_known_and_unknown_names() {
    let c = Classifier::new();
    let dog = c.classify_image("my_dog_photo.jpg").unwrap();
    assert_eq!(dog.label, "class_animal");
    assert_eq!(dog.confidence, 0.9);

    let other = c.classify_image("random123.jpg").unwrap();
    assert_eq!(other.label, "class_others");
    assert_eq!(other.confidence, 0.5);

    assert_eq!(c.classify_image("Fried_Chicken.png").unwrap().label, "class_food");
    assert_eq!(c.classify_image("/a/b/mandir.jpg").unwrap().label, "class_nature");
}

#[test]
fn test_detection_rules() {
    let c = Classifier::new();
    assert_eq!(
        c.detect_objects("tax_doc_2023.pdf").unwrap(),
        vec![Label {
            label: "book".into(),
            confidence: 0.95
        }]
    );
    assert_eq!(c.detect_objects("suit_fitting.jpg").unwrap()[0].label, "person");
    assert!(c.detect_objects("sunset.jpg").unwrap().is_empty());
    // only the file name counts, not the directory
    assert!(c.detect_objects("/docs/sunset.jpg").unwrap().is_empty());
}

#[test]
fn test_missing_path_is_rejected() {
    let c = Classifier::new();
    assert_eq!(
        c.classify_image(""),
        Err(ClassifierError::InvalidArguments("Missing image path".into()))
    );
    assert!(c.detect_objects("").is_err());
    assert!(c.categorize("", DEFAULT_THRESHOLD).is_err());
}

#[test]
fn test_categorize_prefers_detections() {
    let c = Classifier::new();
    assert_eq!(c.categorize("doc_cat.jpg", DEFAULT_THRESHOLD).unwrap(), Bucket::Docs);
    assert_eq!(c.categorize("person_park.jpg", DEFAULT_THRESHOLD).unwrap(), Bucket::People);
    assert_eq!(c.categorize("tree.jpg", DEFAULT_THRESHOLD).unwrap(), Bucket::Nature);
    assert_eq!(c.categorize("x.jpg", DEFAULT_THRESHOLD).unwrap(), Bucket::Others);
    // a threshold above the detection confidence skips straight to the classifier
    assert_eq!(c.categorize("doc_cat.jpg", 0.99).unwrap(), Bucket::Animal);
}

#[test]
fn test_label_serializes_like_plugin_result() {
    let label = Classifier::new().classify_image("dog.jpg").unwrap();
    let json = serde_json::to_value(&label).unwrap();
    assert_eq!(json["label"], "class_animal");
    assert!(json["confidence"].as_f64().unwrap() > 0.89);
}
