//! Round constants for the Poseidon2 permutation over the bn254 scalar field
//!
//! Parameters: width 3, `x^5` S-box, 8 full rounds, 56 partial rounds. The
//! values are the Grain LFSR output for this instance and must stay identical
//! to the table used by the verifying circuit.

use ark_ff::MontFp;

use crate::scalar::Scalar;

use super::{R_F, R_P, WIDTH};

/// Constants for the full (external) rounds, first half followed by second half
pub(crate) const FULL_ROUND_CONSTANTS: [[Scalar; WIDTH]; R_F] = [
    [
        Scalar(MontFp!("13128406282895484157369354038809433636203389051939936481821261911791933663254")),
        Scalar(MontFp!("18931653859213243425446645781588512487838213266321401679594943842133071369744")),
        Scalar(MontFp!("14100663835952519432830313936592734340076294692040144715814219945570907513297")),
    ],
    [
        Scalar(MontFp!("4829113795940962171577509772302063766582957624337039572002553144762883322341")),
        Scalar(MontFp!("15524196826242151316602020382811195434692947787822797536837043495207890599720")),
        Scalar(MontFp!("11824742889827005569732308046012743315382715056680481843559537371456931944245")),
    ],
    [
        Scalar(MontFp!("15824369292130948538570881538463827283727388637222356799784648390667783881850")),
        Scalar(MontFp!("7395652367440825515524159918310823124942438011035473842936180620057265532493")),
        Scalar(MontFp!("1241351203963627868835881804826107927839874261162687401459390240620885410254")),
    ],
    [
        Scalar(MontFp!("6688265362431458560657026053775250595854204120757399493099812773970419156132")),
        Scalar(MontFp!("18628865421786169197184064906533816626840829027307965436801990532221681661310")),
        Scalar(MontFp!("17770079997659052348824924629777474963416629061770380464722096481670103655806")),
    ],
    [
        Scalar(MontFp!("12123026335854515584932892161148559902027319284544852339906677442670161590992")),
        Scalar(MontFp!("11747143856113197599032240626240804787576886917202313931914972592787570603429")),
        Scalar(MontFp!("12689083329367969619896630238881490862330991685178863399139986099061967775891")),
    ],
    [
        Scalar(MontFp!("9363616378570856727297258914956380343356030981401312041884116403700849212733")),
        Scalar(MontFp!("13238291046435061349401827110993774315432323243867917623501520885175217584478")),
        Scalar(MontFp!("13857006478672530359037215101120381968370236111775805219419707798416454682620")),
    ],
    [
        Scalar(MontFp!("2022752961549084842139747691238383165524359342011064407942599644003308437489")),
        Scalar(MontFp!("11377043765620686524844863869245961003946340433252666374730228559486855986878")),
        Scalar(MontFp!("9107028336454933966239128359918274121166034584181733998485105905495346200934")),
    ],
    [
        Scalar(MontFp!("900063247840342897532382686223939136593244983486268682637380837456165317070")),
        Scalar(MontFp!("11261302954518146885624063833699323298803404236535464228351677636819579513431")),
        Scalar(MontFp!("7126990412157463341897179572979760225771626877677162088926546182321369054630")),
    ],
];

/// Constants for the partial (internal) rounds, applied to the first state element only
pub(crate) const PARTIAL_ROUND_CONSTANTS: [Scalar; R_P] = [
    Scalar(MontFp!("11811415718957691261673974625780511541635150909919309658375768251762566747317")),
    Scalar(MontFp!("17491388639298611159333770975992024026420968324544834879936543171716736973879")),
    Scalar(MontFp!("5647537972700463414111873015737673282707440513292923385601908870282442800104")),
    Scalar(MontFp!("13098696909140066209556423100763036393001603197583133354863092304798723388565")),
    Scalar(MontFp!("6951180250619279643770888203380891623788978362131976553140006882493632020745")),
    Scalar(MontFp!("11250251081997661635793843737498879309304455145146915350538637298238893102958")),
    Scalar(MontFp!("2246982048814095620312232487641427155108104073024754628893054837638848127964")),
    Scalar(MontFp!("18897180842973857564376958241871700087418903006311506731527228148081597475814")),
    Scalar(MontFp!("11557404599711559103972421944754928847181400366333080241838467983028485750549")),
    Scalar(MontFp!("17156358787639157774388183034849932704703797218604790661321342987075785318260")),
    Scalar(MontFp!("8846001957151556825394442611430138293780354129800063716225175548340091032449")),
    Scalar(MontFp!("21883449834630454155761926448978525628607016008113566399646971468161186616967")),
    Scalar(MontFp!("11782201180140779170005707786217005381305915516114251118577530420880166417952")),
    Scalar(MontFp!("19574374768428302416384468550351257389078501920039012797497943057156188490399")),
    Scalar(MontFp!("8515987927591912252146893631936027853249294776314628553087138119917968203620")),
    Scalar(MontFp!("17278996890957540943430295799612663512184925495827057764219426280563743078943")),
    Scalar(MontFp!("4560144125266860756441160513270281593457202308593722614013851111005532208589")),
    Scalar(MontFp!("18507459160700813704135500972073304101922968342745790738233104310822653821881")),
    Scalar(MontFp!("12853272419783978245995917302225694649366687506910892647236063701566570840428")),
    Scalar(MontFp!("14374895923592519298500369713759001634990764548024903321294831249025876110484")),
    Scalar(MontFp!("1754533789272381217541450481312878927560073411620344950409407505576538004136")),
    Scalar(MontFp!("20448232810715691360468548645921483318770769828465347895613479253435247065293")),
    Scalar(MontFp!("4203277692183102377396835282861288449527228200284576966986741905195109677387")),
    Scalar(MontFp!("11506339386261725202512749094297334054772084639665212079028551409689271965431")),
    Scalar(MontFp!("4408799661846477128378547528471700197737434561274043409442231147309460168718")),
    Scalar(MontFp!("10862521404448958117187164110262290189825635328197001646848012017699995213390")),
    Scalar(MontFp!("7012061838863338817532836723152059636816924388921632356281537445328382279260")),
    Scalar(MontFp!("8337544039076735620694225144163354013921209405711398618659178986151546625400")),
    Scalar(MontFp!("16173744372216956516796750206695252671549928142051779144629150462255079400849")),
    Scalar(MontFp!("19072902632067672883974143637757649536845413107085656789672471396027868707732")),
    Scalar(MontFp!("3487852254355424154670010750480228751987308757772575371606146474985412561707")),
    Scalar(MontFp!("17727517395793273304860106667199855253218123164763798377815886217088561516989")),
    Scalar(MontFp!("13280131383170382695839570176732265848909891244754629477752800360224963964534")),
    Scalar(MontFp!("21504421972374418324171209120165696620934505501591484695447432472073975792776")),
    Scalar(MontFp!("13753604424945682926871108642602624411461374991709441590662260371815673344981")),
    Scalar(MontFp!("8053178768600673579416591772204841415225213226540397062676127402210384682315")),
    Scalar(MontFp!("15101558583452488762759591936595783545455044970328380152280373697190919758012")),
    Scalar(MontFp!("6286700389345423344101403023711121482167900236544298155098199100234816571786")),
    Scalar(MontFp!("19368755554193272721035317233504719593365546521121074341670771231332472422552")),
    Scalar(MontFp!("13306281365497267243785678269212920842854030794417306689235276460198094483575")),
    Scalar(MontFp!("10121764749051640353641114693266514664967620368543293902008953934189850195966")),
    Scalar(MontFp!("179619165022370308972665071682395477322215797039585945216341070107573537790")),
    Scalar(MontFp!("14053393851645634065914179337120715807963438235922115988819572738574714471437")),
    Scalar(MontFp!("17345906218970918797922168310670548252023720338285437740234091480846393436478")),
    Scalar(MontFp!("10383068492552043678323859571562933490503408853170063884414176092784243607055")),
    Scalar(MontFp!("12096041499044892166554391619429604246288825927654072010011878199637889490527")),
    Scalar(MontFp!("6449742640166027959651492823149770763572943879017164812917305794918053034585")),
    Scalar(MontFp!("6551805454148805882554763665748573416514894105513920161214733482541847062214")),
    Scalar(MontFp!("3651410956659878392469489270906333016569562868954890104332567650040497030813")),
    Scalar(MontFp!("15219053914464753937310253926447830297339787956721755285255510737973021838676")),
    Scalar(MontFp!("881679665678132972106931291023348167890022611850562267871389203532691753422")),
    Scalar(MontFp!("5006067481688857073852527145736822635357747460125905556158034280392250104971")),
    Scalar(MontFp!("12765332320844032254009314500332101047115754896003948733635815046365410860591")),
    Scalar(MontFp!("12908190215073542091623737558383307555705501651914623082354191483197810853182")),
    Scalar(MontFp!("1446042792715825508366007519346636771782990303010685652946852324744810237839")),
    Scalar(MontFp!("17414863822034645298427260856470503848317996477890518738401812766215195632841")),
];
