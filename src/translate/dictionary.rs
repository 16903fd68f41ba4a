use super::TranslateError;

type Glossary = &'static [(&'static str, &'static str)];

// Longer terms come first so "외국인" is replaced before any shorter overlap.
const EN: Glossary = &[
    ("외국인", "Foreigner"),
    ("근로자", "Worker"),
    ("비자", "Visa"),
    ("취업", "Employment"),
    ("고용", "Employment"),
    ("주거", "Housing"),
    ("의료", "Medical"),
    ("교육", "Education"),
    ("지원", "Support"),
    ("신청", "Application"),
    ("안내", "Guide"),
    ("변경", "Change"),
    ("체류", "Stay"),
    ("연장", "Extension"),
    ("접수", "Reception"),
    ("마감", "Deadline"),
];

const VI: Glossary = &[
    ("외국인", "Người nước ngoài"),
    ("근로자", "Người lao động"),
    ("비자", "Thị thực"),
    ("취업", "Việc làm"),
    ("고용", "Tuyển dụng"),
    ("주거", "Nhà ở"),
    ("의료", "Y tế"),
    ("교육", "Giáo dục"),
    ("지원", "Hỗ trợ"),
    ("신청", "Đăng ký"),
    ("안내", "Hướng dẫn"),
    ("변경", "Thay đổi"),
    ("체류", "Lưu trú"),
    ("연장", "Gia hạn"),
    ("접수", "Tiếp nhận"),
    ("마감", "Hạn chót"),
];

const TH: Glossary = &[
    ("외국인", "ชาวต่างชาติ"),
    ("근로자", "คนงาน"),
    ("비자", "วีซ่า"),
    ("취업", "การจ้างงาน"),
    ("고용", "การจ้างงาน"),
    ("주거", "ที่อยู่อาศัย"),
    ("의료", "การแพทย์"),
    ("교육", "การศึกษา"),
    ("지원", "สนับสนุน"),
    ("신청", "สมัคร"),
    ("안내", "คู่มือ"),
    ("변경", "เปลี่ยนแปลง"),
    ("체류", "พำนัก"),
    ("연장", "ขยายเวลา"),
    ("접수", "รับสมัคร"),
    ("마감", "กำหนดเวลา"),
];

/// Static keyword substitution used when no remote provider is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackDictionary;

impl FallbackDictionary {
    pub fn supports(&self, lang: &str) -> bool {
        glossary(lang).is_some()
    }

    pub fn translate(&self, text: &str, lang: &str) -> Result<String, TranslateError> {
        let glossary =
            glossary(lang).ok_or_else(|| TranslateError::UnsupportedLanguage(lang.to_string()))?;
        Ok(glossary
            .iter()
            .fold(text.to_string(), |acc, (korean, foreign)| {
                acc.replace(korean, foreign)
            }))
    }
}

fn glossary(lang: &str) -> Option<Glossary> {
    match lang {
        "en" => Some(EN),
        "vi" => Some(VI),
        "th" => Some(TH),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_terms() {
        let dict = FallbackDictionary;
        assert_eq!(
            dict.translate("외국인 근로자 비자 연장 안내", "en").unwrap(),
            "Foreigner Worker Visa Extension Guide"
        );
        assert_eq!(dict.translate("체류 지원", "vi").unwrap(), "Lưu trú Hỗ trợ");
    }

    #[test]
    fn unknown_terms_pass_through() {
        let dict = FallbackDictionary;
        assert_eq!(dict.translate("2026년 공고", "th").unwrap(), "2026년 공고");
    }

    #[test]
    fn unsupported_language_is_an_error() {
        let err = FallbackDictionary.translate("안내", "fr").unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedLanguage(lang) if lang == "fr"));
    }
}
