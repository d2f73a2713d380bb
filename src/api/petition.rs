use log::{debug, info};
use rocket::{
    form::Form,
    response::{content::RawHtml, Redirect},
    Route,
};

use crate::{
    error::Result,
    logging::RequestId,
    model::{
        db::petition::Petition,
        form::{petition::PetitionForm, FieldErrors, Validate},
        mongodb::Coll,
    },
    view::{petition_page, FormResponse},
};

pub fn routes() -> Vec<Route> {
    routes![petition_form, submit_petition]
}

#[get("/peticion?<sent>")]
fn petition_form(sent: Option<bool>) -> RawHtml<String> {
    petition_page(
        &PetitionForm::default(),
        &FieldErrors::default(),
        sent.unwrap_or(false),
    )
}

#[post("/peticion", data = "<form>")]
async fn submit_petition(
    form: Form<PetitionForm>,
    petitions: Coll<Petition>,
    request_id: &RequestId,
) -> Result<FormResponse> {
    let petition = match form.validate() {
        Ok(petition) => petition,
        Err(errors) => {
            debug!("req{request_id} rejected petition: {errors}");
            return Ok(FormResponse::Page(petition_page(&form, &errors, false)));
        }
    };

    petitions.insert_one(&petition, None).await?;
    info!("req{request_id} stored petition from {}", petition.email);

    Ok(FormResponse::Redirect(Redirect::found("/peticion?sent=true")))
}
