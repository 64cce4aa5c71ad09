//! Starter questions shown on an empty conversation

use rand::seq::SliceRandom;
use rand::Rng;

/// Common farmer questions offered as one-tap prompts
pub const FARMER_QUESTIONS: &[&str] = &[
    "इस मौसम में उगाने के लिए सबसे अच्छी फसलें",
    "गेहूं में कीटों से बचाव के तरीके",
    "धान की सिंचाई के सर्वोत्तम तरीके",
    "मिट्टी की जांच कैसे करें?",
    "सब्जियों की उर्वरक की सही मात्रा कितनी होनी चाहिए?",
    "फलदार पौधों की देखभाल के टिप्स",
    "सस्ते और प्रभावी कीट नियंत्रण के उपाय",
    "सूखी मिट्टी में फसल उगाने के तरीके",
    "बुवाई के लिए आदर्श समय कौन सा है?",
    "फसल में पोषण की कमी कैसे पहचानें?",
    "बाजार में फसल बेचने के सर्वोत्तम तरीके",
    "जैविक खाद बनाने के सरल तरीके",
    "खेती में पानी की बचत के उपाय",
    "कृषि मशीनरी का सही इस्तेमाल कैसे करें?",
    "धान की उचित कटाई का समय",
    "फसल के रोगों का जल्दी पता लगाने के संकेत",
    "बीज बोने से पहले मिट्टी की तैयारी कैसे करें?",
    "नमी और तापमान के अनुसार सिंचाई की योजना",
    "जैविक कीट नियंत्रण के प्रभावी तरीके",
    "फसल के लिए उपयुक्त उर्वरक का चुनाव",
    "अनाज की भंडारण और सुरक्षा के तरीके",
    "सूखा या बाढ़ के समय फसल सुरक्षा उपाय",
    "मौसमी फसल विविधता बढ़ाने के सुझाव",
    "कृषि बीमा लेने की प्रक्रिया और लाभ",
];

/// How many prompts the empty view offers
pub const DEFAULT_SUGGESTION_COUNT: usize = 4;

/// Pick `count` distinct questions at random
pub fn suggestions(count: usize) -> Vec<&'static str> {
    suggestions_with(&mut rand::thread_rng(), count)
}

/// [`suggestions`] with a caller-supplied generator
pub fn suggestions_with<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<&'static str> {
    FARMER_QUESTIONS
        .choose_multiple(rng, count.min(FARMER_QUESTIONS.len()))
        .copied()
        .collect()
}
