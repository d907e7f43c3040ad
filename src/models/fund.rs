use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Fund {
    pub name: String,
    pub cik: String,
}

impl Fund {
    pub fn new(name: &str, cik: &str) -> Self {
        Fund {
            name: name.to_string(),
            cik: cik.to_string(),
        }
    }
}

/// Life-science focused managers tracked when no fund list is supplied.
pub fn default_funds() -> Vec<Fund> {
    [
        ("Avoro Capital Advisors LLC", "0001633313"),
        ("Baker Bros. Advisors LP", "0001263508"),
        ("BVF Inc", "0001056807"),
        ("Checkpoint Capital L.P.", "0001977548"),
        ("Commodore Capital LP", "0001831942"),
        ("Cormorant Asset Management, LP", "0001583977"),
        ("Darwin Global Management, Ltd.", "0001839209"),
        ("Frazier Life Sciences Management, L.P.", "0001892134"),
        ("Logos Global Management LP", "0001792126"),
        ("Lynx1 Capital Management LP", "0001910456"),
        ("Paradigm Biocapital Advisors LP", "0001855655"),
        ("Perceptive Advisors LLC", "0001224962"),
        ("Ra Capital Management, L.P.", "0001346824"),
        ("Rock Springs Capital Management LP", "0001595725"),
        ("Rtw Investments, LP", "0001493215"),
        ("Vivo Capital, LLC", "0001674712"),
    ]
    .into_iter()
    .map(|(name, cik)| Fund::new(name, cik))
    .collect()
}
