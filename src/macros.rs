/// Implements JSON request-body parsing for an API payload type,
/// bounded by the API data limit.
macro_rules! json_payload {
    ($payload:ident) => {
        impl rocket::data::FromDataSimple for $payload {
            type Error = String;

            fn from_data(request: &rocket::Request, data: rocket::Data) -> rocket::data::Outcome<Self, String> {
                use std::io::Read;

                // Ensure the content type is JSON before opening the data.
                if request.content_type() != Some(&rocket::http::ContentType::JSON) {
                    return rocket::Outcome::Forward(data);
                }

                // Read the body up to the data limit.
                let mut body = String::new();
                if let Err(error) = data
                    .open()
                    .take($crate::apis::DATA_LIMIT)
                    .read_to_string(&mut body)
                {
                    return rocket::Outcome::Failure((
                        rocket::http::Status::InternalServerError,
                        format!("{:?}", error),
                    ));
                }

                match serde_json::from_str(&body) {
                    Ok(payload) => rocket::Outcome::Success(payload),
                    Err(error) => rocket::Outcome::Failure((rocket::http::Status::BadRequest, format!("{:?}", error))),
                }
            }
        }
    };
}
